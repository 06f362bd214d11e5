//! Entry point for objload.
//! Loads one or many OBJ files concurrently and reports per-file results.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use asset::{CancelToken, FsProvider, LoadRequest, LoadResult, Loader, LoaderConfig, MeshBuilder};

mod scene;

fn parse_threads_arg() -> usize {
    // --threads=N, 0 = one per core
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--threads=") {
            match val.parse::<usize>() {
                Ok(n) => return n,
                Err(_) => log::warn!("Invalid thread count '{}', using default.", val),
            }
        }
    }
    0
}

fn parse_dir_arg() -> Option<PathBuf> {
    std::env::args().find_map(|arg| arg.strip_prefix("--dir=").map(PathBuf::from))
}

fn positional_paths() -> Vec<PathBuf> {
    std::env::args()
        .skip(1)
        .filter(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .collect()
}

/// Every `*.obj` file directly inside `dir`, sorted by path.
fn collect_obj_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_obj = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"));
        if path.is_file() && is_obj {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LoaderConfig {
        worker_threads: parse_threads_arg(),
    };
    let mut paths = positional_paths();
    if let Some(dir) = parse_dir_arg() {
        paths.extend(collect_obj_files(&dir)?);
    }
    if paths.is_empty() {
        anyhow::bail!("usage: objload [--threads=N] [--dir=PATH] [FILE.obj ...]");
    }

    let requests: Vec<LoadRequest> = paths.into_iter().map(LoadRequest::new).collect();
    log::info!(
        "Starting objload. {} file(s), threads={}",
        requests.len(),
        config.worker_threads
    );

    let loader =
        Loader::new(&config, Arc::new(FsProvider)).context("Failed to start worker pool")?;
    let results = loader.load_batch(&requests, &CancelToken::new());

    let mut scene = scene::Scene::new();
    let mut failed = 0;
    for (request, result) in requests.iter().zip(results) {
        match result {
            LoadResult::Success(mesh) => {
                let (vertices, triangles) = (mesh.vertex_count(), mesh.triangle_count());
                let id = scene.build(request.source.name(), mesh);
                if let Some(obj) = scene.get(id) {
                    log::debug!(
                        "{}: material={}, {} slot normals, {} smoothed normals",
                        obj.name,
                        obj.material,
                        obj.mesh.normals().len(),
                        obj.smooth_normals.len()
                    );
                }
                println!(
                    "ok    {}  #{id}  {vertices} vertices, {triangles} triangles",
                    request.source
                );
            }
            LoadResult::Failure { source, error } => {
                failed += 1;
                println!("fail  {source}  [{}] {error}", error.kind());
            }
        }
    }

    if let Some(bounds) = scene.bounds() {
        log::info!("Scene bounds: min={:?} max={:?}", bounds.min, bounds.max);
    }
    log::info!("{} loaded, {} failed", scene.objects().len(), failed);

    if failed == requests.len() {
        anyhow::bail!("no file could be loaded");
    }
    Ok(())
}
