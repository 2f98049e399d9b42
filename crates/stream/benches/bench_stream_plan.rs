use std::collections::BTreeSet;
use std::hint::black_box;
use std::time::Instant;

use tilestream_stream::{AuthoredGrid, TileCoord, desired_set, diff, tile_at};

fn bench_tile_at(iterations: usize) {
    let start = Instant::now();
    for i in 0..iterations {
        let position = glam::Vec3::new(i as f32 * 3.7 - 5000.0, 0.0, i as f32 * -1.3);
        let _ = black_box(tile_at(black_box(position), 500.0));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  tile_at ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_desired_set(radius: u32, iterations: usize) {
    let center = TileCoord::new(3, -4);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(desired_set(black_box(center), black_box(radius)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  desired set (r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_diff(radius: u32, iterations: usize) {
    let grid = AuthoredGrid::from_naming(10);
    let mut resident = BTreeSet::new();

    let start = Instant::now();
    for i in 0..iterations {
        // Simulate the observer walking east one tile per pass
        let center = TileCoord::new((i % 10) as i32, 0);
        let desired = desired_set(center, radius);
        let work = black_box(diff(black_box(&desired), black_box(&resident), &grid));
        for coord in &work.to_unload {
            resident.remove(coord);
        }
        resident.extend(work.to_load);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  diff (r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Stream Plan Benchmarks ===\n");

    println!("Position to tile:");
    bench_tile_at(100_000);

    println!("\nDesired set:");
    bench_desired_set(1, 10000);
    bench_desired_set(4, 10000);
    bench_desired_set(16, 1000);

    println!("\nResidency diff:");
    bench_diff(1, 10000);
    bench_diff(4, 1000);
    bench_diff(16, 100);

    println!("\n=== Done ===");
}
