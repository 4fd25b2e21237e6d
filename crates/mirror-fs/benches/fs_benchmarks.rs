use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mirror_fs::io;
use mirror_fs::{FsTree, TreeReader};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn copy_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::copy_atomic", |b| {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&source, vec![7u8; 64 * 1024]).unwrap();

        b.iter(|| {
            io::copy_atomic(black_box(&source), black_box(&dest)).unwrap();
        })
    });
}

fn snapshot_benchmark(c: &mut Criterion) {
    c.bench_function("FsTree::snapshot (500 entries)", |b| {
        let dir = tempdir().unwrap();
        for i in 0..500 {
            fs::write(dir.path().join(format!("file_{i}.txt")), "x").unwrap();
        }
        let tree = FsTree::new(dir.path());

        b.iter(|| {
            let snapshot = tree.snapshot(black_box(Path::new(""))).unwrap();
            assert_eq!(snapshot.len(), 500);
        })
    });
}

criterion_group!(benches, copy_atomic_benchmark, snapshot_benchmark);
criterion_main!(benches);
