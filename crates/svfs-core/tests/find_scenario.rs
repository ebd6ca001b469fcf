//! §8 scenario 5: `find`-style traversal composed from `readdir`/`stat`
//! across the router and the in-memory adapter. There is no `find` command
//! in the shipped surface (§6 only names `mount`/`umount`/`git`); this
//! exercises the same mindepth/maxdepth/type filtering a shell `find`
//! builtin would perform on top of this crate's `FileSystem` capability.

use std::sync::Arc;

use svfs_core::memfs::MemFs;
use svfs_core::{FileSystem, Router};

/// Depth-bounded, type-filtered directory walk: `mindepth`/`maxdepth` count
/// path components below `root`, `only_files` mirrors `-type f`.
async fn find(fs: &dyn FileSystem, root: &str, mindepth: usize, maxdepth: usize, only_files: bool) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![(root.to_owned(), 0usize)];
    while let Some((dir, depth)) = stack.pop() {
        let Ok(mut names) = fs.readdir(&dir).await else { continue };
        names.sort();
        for name in names {
            let child = if dir == "/" { format!("/{name}") } else { format!("{dir}/{name}") };
            let child_depth = depth + 1;
            let Ok(stat) = fs.stat(&child).await else { continue };
            if child_depth >= mindepth && child_depth <= maxdepth && (!only_files || stat.is_file) {
                out.push(child.clone());
            }
            if stat.is_directory && child_depth < maxdepth {
                stack.push((child, child_depth));
            }
        }
    }
    out.sort();
    out
}

#[tokio::test]
async fn find_mindepth_maxdepth_type_f() {
    let router = Router::new(Arc::new(MemFs::new()));
    router.mkdir("/project", true).await.unwrap();
    router.write_file("/project/README.md", b"# hi").await.unwrap();
    router.write_file("/project/package.json", b"{}").await.unwrap();
    router.write_file("/project/tsconfig.json", b"{}").await.unwrap();
    router.mkdir("/project/src", true).await.unwrap();
    router.mkdir("/project/tests", true).await.unwrap();
    router.write_file("/project/src/index.ts", b"export {}").await.unwrap();

    let hits = find(&router, "/project", 1, 1, true).await;
    assert_eq!(
        hits,
        vec![
            "/project/README.md".to_owned(),
            "/project/package.json".to_owned(),
            "/project/tsconfig.json".to_owned(),
        ]
    );
}
