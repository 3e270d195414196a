use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use tenantadmin_auth::{Permission, PermissionSet, Role, diff, suggestions, validate};

/// Every permission except the conflicting purge grant.
fn everything_valid() -> PermissionSet {
    Permission::ALL
        .into_iter()
        .filter(|p| *p != Permission::AuditPurge)
        .collect()
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for role in Role::ALL {
        let before = Role::Client.baseline();
        let after = role.baseline();
        group.bench_with_input(BenchmarkId::from_parameter(role), &(before, after), |b, (x, y)| {
            b.iter(|| diff(black_box(x), black_box(y)))
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let full = everything_valid();
    c.bench_function("validate/full_catalog", |b| b.iter(|| validate(black_box(&full))));

    let broken: PermissionSet = [Permission::RolesManage, Permission::AuditPurge].into();
    c.bench_function("validate/broken", |b| b.iter(|| validate(black_box(&broken))));
}

fn bench_suggestions(c: &mut Criterion) {
    let current: PermissionSet = [Permission::AuditView, Permission::AuditPurge].into();
    c.bench_function("suggestions/super_admin", |b| {
        b.iter(|| suggestions(black_box(Role::SuperAdmin), black_box(&current)))
    });
}

criterion_group!(benches, bench_diff, bench_validate, bench_suggestions);
criterion_main!(benches);
