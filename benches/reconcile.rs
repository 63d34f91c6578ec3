//! Benchmark for delta generation
//!
//! Target: a 1000-server, 12-drive model reconciled well under a second

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swift_ring_reconciler::model::{GroupType, UNCONFIGURED_ID};
use swift_ring_reconciler::{
    generate_delta, ActualState, DesiredRings, Device, DriveCatalog, DriveSize, HostsTable,
    Presence, ReconcileOptions, RegionRings, RingKey, RingSpec,
};

const REGION: &str = "region1";
const DRIVES_PER_SERVER: usize = 12;

fn rings() -> DesiredRings {
    let mut rings = DesiredRings::new();
    rings.insert(
        REGION.to_string(),
        RegionRings {
            region_name: REGION.into(),
            rings: vec![
                RingSpec::replicated("account", 10, 3.0),
                RingSpec::replicated("object-0", 16, 3.0),
            ],
            ..Default::default()
        },
    );
    rings
}

fn server_name(n: usize) -> String {
    format!("ccp-c1-m{}", n)
}

fn server_ip(n: usize) -> String {
    format!("10.{}.{}.{}", n / 65536, (n / 256) % 256, n % 256)
}

fn desired(servers: usize) -> Vec<Device> {
    let mut devices = Vec::with_capacity(servers * DRIVES_PER_SERVER);
    for n in 0..servers {
        for drive in 0..DRIVES_PER_SERVER {
            let ring = if drive == 0 { "account" } else { "object-0" };
            let drive_name = format!("disk{}", drive);
            let device_path = format!("/dev/sd{}", (b'b' + drive as u8) as char);
            devices.push(Device {
                region_name: REGION.into(),
                ring_name: ring.into(),
                rack_id: None,
                region_id: UNCONFIGURED_ID,
                zone_id: UNCONFIGURED_ID,
                server_name: server_name(n),
                server_ip: server_ip(n),
                server_port: 6000,
                replication_ip: server_ip(n),
                replication_port: 6000,
                meta: Device::build_meta(&server_name(n), &drive_name, &device_path),
                drive_name,
                device_path,
                group_type: GroupType::Disk,
                presence: Presence::Present,
                weight: 0.0,
                balance: 0.0,
                backing: None,
                device_id: None,
            });
        }
    }
    devices
}

fn catalog(servers: usize) -> DriveCatalog {
    let mut catalog = DriveCatalog::new();
    for n in 0..servers {
        for drive in 0..DRIVES_PER_SERVER {
            catalog.insert_drive(
                &server_name(n),
                &server_ip(n),
                &format!("/dev/sd{}", (b'b' + drive as u8) as char),
                DriveSize {
                    size_bytes: 4 << 40,
                    is_full_drive: true,
                },
            );
        }
    }
    catalog
}

/// Actual state holding every desired device at half its target weight
fn half_built(devices: &[Device], rings: &DesiredRings) -> ActualState {
    let mut state = ActualState::default();
    for (region_name, region) in rings {
        for ring in &region.rings {
            state.rings.insert(RingKey::new(region_name, &ring.name), ring.clone());
        }
    }
    state.devices = devices
        .iter()
        .cloned()
        .map(|mut d| {
            d.region_id = 1;
            d.zone_id = 1;
            d.weight = 2048.0;
            d
        })
        .collect();
    state
}

fn bench_generate_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_delta");
    let rings = rings();
    let hosts = HostsTable::new();

    for servers in [10usize, 100, 1000] {
        let devices = desired(servers);
        let catalog = catalog(servers);
        let empty = ActualState::default();
        let existing = half_built(&devices, &rings);
        group.throughput(Throughput::Elements(devices.len() as u64));

        group.bench_with_input(BenchmarkId::new("new_rings", servers), &devices, |b, devices| {
            b.iter(|| {
                let _ = generate_delta(
                    black_box(devices.clone()),
                    &rings,
                    &empty,
                    &catalog,
                    &hosts,
                    ReconcileOptions::default(),
                );
            });
        });

        group.bench_with_input(BenchmarkId::new("stepped_reweight", servers), &devices, |b, devices| {
            let options = ReconcileOptions {
                weight_step: Some(256.0),
                ..Default::default()
            };
            b.iter(|| {
                let _ = generate_delta(
                    black_box(devices.clone()),
                    &rings,
                    &existing,
                    &catalog,
                    &hosts,
                    options.clone(),
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate_delta);
criterion_main!(benches);
