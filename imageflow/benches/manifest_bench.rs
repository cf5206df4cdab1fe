//! Benchmarks for manifest serialization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use imageflow::prelude::*;
use imageflow::testing::{test_manifest, test_subscription};

fn packages(count: usize) -> Vec<PackageSpec> {
    (0..count)
        .rev()
        .map(|i| {
            PackageSpec::new(format!("pkg{i:04}"), format!("sha256:{i:064x}"))
                .with_remote_location(format!("https://example.com/pkg{i:04}.rpm"))
        })
        .collect()
}

fn manifest_benchmark(c: &mut Criterion) {
    let content = ResolvedContent::new()
        .with_packages("build", packages(200))
        .with_packages("os", packages(1500));

    c.bench_function("serialize_iot_manifest", |b| {
        b.iter(|| {
            let (mut manifest, build) = test_manifest();
            let os = Os::new(&build, Platform::x86_bios(), Vec::new()).with_customizations(
                OsCustomizations::new()
                    .with_ostree_ref("fedora/37/x86_64/iot")
                    .with_subscription(test_subscription().with_rhc(true)),
            );
            manifest.add_pipeline(os).ok();
            manifest.add_pipeline(OstreeCommit::new(&build, "os", "fedora/37/x86_64/iot")).ok();
            black_box(manifest.serialize(content.clone()).map(|m| m.checkpoints.len()))
        })
    });

    c.bench_function("registration_commands", |b| {
        let subscription = test_subscription().with_rhc(true);
        b.iter(|| black_box(registration_commands(black_box(&subscription))))
    });
}

criterion_group!(benches, manifest_benchmark);
criterion_main!(benches);
