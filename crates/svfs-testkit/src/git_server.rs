//! In-process implementation of the Git smart-HTTP protocol (§4.7),
//! sufficient for clone, fetch, and push of one branch, to run tests
//! without depending on network reachability.
//!
//! `GitRepoCore` drives the client side of this protocol by shelling out to
//! the `git` binary (see `svfs-git::repo`) where `gix` doesn't yet offer a
//! high-level network API. The server side here does the same thing in
//! reverse: each
//! endpoint is a thin HTTP wrapper around `git upload-pack --stateless-rpc`
//! / `git receive-pack --stateless-rpc`, which already speak pkt-line and
//! sideband-64k on stdout — this module only has to supply the
//! `# service=...` pkt-line header the bare subprocess omits (see
//! [`svfs_git::transport`]).

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use svfs_git::transport::{encode_pkt_line_text, FLUSH_PKT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// A running mock Git smart-HTTP server backed by a real (bare) repository
/// on disk. Tests point `GitRepoCore::clone_shallow`/`push`/`pull` at
/// [`Self::url`] in place of a real remote.
pub struct MockGitServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockGitServer {
    /// Serve `repo_path` (an existing bare repository) on an
    /// ephemeral localhost port.
    ///
    /// # Errors
    /// If the listener cannot bind.
    pub async fn start(repo_path: impl Into<PathBuf>) -> io::Result<Self> {
        let repo_path: Arc<Path> = Arc::from(repo_path.into());
        let make_svc = make_service_fn(move |_conn| {
            let repo_path = Arc::clone(&repo_path);
            async move {
                Ok::<_, hyper::Error>(service_fn(move |req| {
                    let repo_path = Arc::clone(&repo_path);
                    async move { Ok::<_, hyper::Error>(handle(req, &repo_path).await) }
                }))
            }
        });
        let server = Server::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .map_err(io::Error::other)?
            .serve(make_svc);
        let addr = server.local_addr();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::warn!(error = %e, "mock git server stopped");
            }
        });
        Ok(Self { addr, handle })
    }

    /// The base URL this server is listening on, e.g. `http://127.0.0.1:PORT`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop serving. The server also stops if this value is dropped.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

async fn handle(req: Request<Body>, repo_path: &Path) -> Response<Body> {
    match (req.method(), req.uri().path(), req.uri().query().unwrap_or("")) {
        (&Method::GET, "/info/refs", q) if q.contains("service=git-upload-pack") => {
            advertise_refs(repo_path, "git-upload-pack").await
        }
        (&Method::GET, "/info/refs", q) if q.contains("service=git-receive-pack") => {
            advertise_refs(repo_path, "git-receive-pack").await
        }
        (&Method::POST, "/git-upload-pack", _) => rpc(req, repo_path, "upload-pack", "application/x-git-upload-pack-result").await,
        (&Method::POST, "/git-receive-pack", _) => rpc(req, repo_path, "receive-pack", "application/x-git-receive-pack-result").await,
        _ => Response::builder().status(StatusCode::NOT_FOUND).body(Body::from("not found")).expect("static response"),
    }
}

async fn advertise_refs(repo_path: &Path, service: &str) -> Response<Body> {
    let subcommand = service.trim_start_matches("git-");
    let output = Command::new("git")
        .arg(subcommand)
        .arg("--stateless-rpc")
        .arg("--advertise-refs")
        .arg(repo_path)
        .output()
        .await;
    let Ok(output) = output else {
        return Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::from("git spawn failed")).expect("static response");
    };
    if !output.status.success() {
        return Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(output.stderr))
            .expect("static response");
    }
    let mut body = Vec::new();
    body.extend_from_slice(&encode_pkt_line_text(&format!("# service={service}")));
    body.extend_from_slice(FLUSH_PKT);
    body.extend_from_slice(&output.stdout);
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", format!("application/x-{service}-advertisement"))
        .body(Body::from(body))
        .expect("static response")
}

async fn rpc(req: Request<Body>, repo_path: &Path, subcommand: &str, content_type: &str) -> Response<Body> {
    let body_bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(b) => b,
        Err(e) => {
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::from(format!("failed to read body: {e}")))
                .expect("static response");
        }
    };

    let mut child = match Command::new("git")
        .arg(subcommand)
        .arg("--stateless-rpc")
        .arg(repo_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from(format!("failed to spawn git {subcommand}: {e}")))
                .expect("static response");
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(&body_bytes).await;
    }

    let mut stdout = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout).await;
    }
    let status = child.wait().await;
    if status.is_err() || !status.map(|s| s.success()).unwrap_or(false) {
        return Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::from(stdout)).expect("static response");
    }

    Response::builder().status(StatusCode::OK).header("content-type", content_type).body(Body::from(stdout)).expect("static response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn bare_repo_with_commit() -> TempDir {
        let src = TempDir::new().unwrap();
        let run = |args: &[&str], cwd: &std::path::Path| {
            let out = StdCommand::new("git").args(args).current_dir(cwd).output().unwrap();
            assert!(out.status.success(), "{args:?}: {}", String::from_utf8_lossy(&out.stderr));
        };
        run(&["init"], src.path());
        run(&["config", "user.email", "t@t.com"], src.path());
        run(&["config", "user.name", "T"], src.path());
        std::fs::write(src.path().join("a.txt"), "hi").unwrap();
        run(&["add", "-A"], src.path());
        run(&["commit", "-m", "c1"], src.path());
        run(&["branch", "-M", "main"], src.path());

        let bare = TempDir::new().unwrap();
        run(&["clone", "--bare", src.path().to_str().unwrap(), bare.path().to_str().unwrap()], std::env::temp_dir().as_path());
        bare
    }

    #[tokio::test]
    async fn serves_upload_pack_advertisement() {
        let bare = bare_repo_with_commit();
        let server = MockGitServer::start(bare.path()).await.unwrap();
        let resp = reqwest::get(format!("{}/info/refs?service=git-upload-pack", server.url())).await.unwrap();
        assert!(resp.status().is_success());
        let bytes = resp.bytes().await.unwrap();
        assert!(bytes.starts_with(b"001e# service=git-upload-pack\n"));
        server.shutdown();
    }

    #[tokio::test]
    async fn clone_over_mock_server_succeeds() {
        let bare = bare_repo_with_commit();
        let server = MockGitServer::start(bare.path()).await.unwrap();
        let dest = TempDir::new().unwrap();
        let out = StdCommand::new("git")
            .args(["clone", "--depth", "1", "--single-branch", "--branch", "main", &server.url(), dest.path().to_str().unwrap()])
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert!(dest.path().join("a.txt").exists());
        server.shutdown();
    }
}
