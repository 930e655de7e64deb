//! Benchmarks of chunk generation and culled mesh rebuilds.

use cgmath::Point3;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voxel_streamer::config::GeneratorConfig;
use voxel_streamer::engine_state::voxels::chunk::{Chunk, NoNeighbors};
use voxel_streamer::engine_state::voxels::generation::patterns::{
    CheckerboardGenerator, SolidGenerator,
};
use voxel_streamer::engine_state::voxels::generation::perlin::PerlinGenerator;
use voxel_streamer::engine_state::voxels::generation::terrain::TerrainGenerator;
use voxel_streamer::WorldGenerator;

/// Generates one chunk at `position` with every pass of `generator`.
fn generated_chunk(generator: &dyn WorldGenerator, position: Point3<i32>) -> Chunk {
    let mut chunk = Chunk::new(position);
    generator.generate(&mut chunk).unwrap();
    generator.decorate(&mut chunk).unwrap();
    chunk
}

/// Rebuild cost across fill patterns, from fully culled to worst case.
fn bench_rebuild(c: &mut Criterion) {
    let terrain = TerrainGenerator::new(&GeneratorConfig::default());
    let generators: [(&str, &dyn WorldGenerator, Point3<i32>); 4] = [
        ("solid", &SolidGenerator, Point3::new(0, 0, 0)),
        ("checkerboard", &CheckerboardGenerator, Point3::new(0, 0, 0)),
        ("perlin", &PerlinGenerator::new(7), Point3::new(1, 0, 1)),
        ("terrain", &terrain, Point3::new(0, 0, 0)),
    ];

    let mut group = c.benchmark_group("rebuild_geometry");
    for (name, generator, position) in generators {
        let chunk = generated_chunk(generator, position);
        group.bench_with_input(BenchmarkId::from_parameter(name), &chunk, |b, chunk| {
            b.iter(|| black_box(chunk.rebuild_geometry(&NoNeighbors)))
        });
    }
    group.finish();
}

/// Generation cost of the noise-based generators.
fn bench_generate(c: &mut Criterion) {
    let terrain = TerrainGenerator::new(&GeneratorConfig::default());
    let perlin = PerlinGenerator::new(7);

    c.bench_function("terrain::generate (16³)", |b| {
        b.iter(|| black_box(generated_chunk(&terrain, black_box(Point3::new(3, 0, -2)))))
    });
    c.bench_function("perlin::generate (16³)", |b| {
        b.iter(|| black_box(generated_chunk(&perlin, black_box(Point3::new(3, 0, -2)))))
    });
}

criterion_group!(benches, bench_rebuild, bench_generate);
criterion_main!(benches);
