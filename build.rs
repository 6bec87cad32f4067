use nalgebra::Vector3;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use wide::{CmpLe, f64x4};

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("tuned_constants.rs");
    let mut f = File::create(&dest_path).unwrap();

    let mut parallel_threshold = 256;

    // Calibration: time a serial pair scan to decide how much work a
    // particle range needs before handing it to the thread pool pays off.
    let n_test = 500;
    let mut pos = Vec::with_capacity(n_test);
    for i in 0..n_test {
        let t = i as f64;
        pos.push(Vector3::new(t % 10.0, (t / 10.0) % 10.0, t / 100.0));
    }
    let radius = 1.5;

    let start = Instant::now();
    let mut total = 0;
    for _ in 0..5 {
        total += count_pairs_simd(&pos, radius);
    }
    let duration = start.elapsed() / 5;
    let micros = duration.as_micros();

    if micros < 1000 {
        parallel_threshold = 512;
    } else if micros > 15000 {
        parallel_threshold = 128;
    }

    writeln!(
        f,
        "pub const TUNED_PARALLEL_THRESHOLD: usize = {};",
        parallel_threshold
    )
    .unwrap();

    println!(
        "cargo:warning=Auto-tuning: PARALLEL_THRESHOLD={} (calibration pairs={})",
        parallel_threshold,
        total / 5
    );
    println!("cargo:rerun-if-changed=build.rs");
}

fn count_pairs_simd(positions: &[Vector3<f64>], radius: f64) -> usize {
    let n = positions.len();
    let radius_sq = radius * radius;
    let radius_sq_v = f64x4::from(radius_sq);
    let mut count = 0;

    let mut px = Vec::with_capacity(n);
    let mut py = Vec::with_capacity(n);
    let mut pz = Vec::with_capacity(n);
    for p in positions {
        px.push(p.x);
        py.push(p.y);
        pz.push(p.z);
    }

    for i in 0..n {
        let pix = f64x4::from(px[i]);
        let piy = f64x4::from(py[i]);
        let piz = f64x4::from(pz[i]);
        let mut j = i + 1;
        while j + 4 <= n {
            let pjx = f64x4::from(&px[j..j + 4]);
            let pjy = f64x4::from(&py[j..j + 4]);
            let pjz = f64x4::from(&pz[j..j + 4]);
            let dx = pjx - pix;
            let dy = pjy - piy;
            let dz = pjz - piz;
            let d2 = dx * dx + dy * dy + dz * dz;
            let mask = d2.cmp_le(radius_sq_v);
            count += mask.move_mask().count_ones() as usize;
            j += 4;
        }
        for k in j..n {
            let dx = px[k] - px[i];
            let dy = py[k] - py[i];
            let dz = pz[k] - pz[i];
            if dx * dx + dy * dy + dz * dz <= radius_sq {
                count += 1;
            }
        }
    }
    count
}
