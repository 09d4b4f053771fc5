use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Write a synthetic dataset in the published CSV layout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "data/sample")]
    output_dir: PathBuf,

    /// Number of months, starting January 2025
    #[arg(short, long, default_value = "12")]
    months: u32,

    /// Month (1-based) with no activity anywhere
    #[arg(long, default_value = "6")]
    outage_month: u32,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

const DISTRICTS: &[(&str, &str, u64)] = &[
    ("Uttar Pradesh", "Lucknow", 900),
    ("Uttar Pradesh", "Varanasi", 700),
    ("Bihar", "Patna", 800),
    ("Bihar", "Sitamarhi", 400),
    ("Haryana", "Nuh", 300),
    ("Haryana", "Gurugram", 600),
    ("westbengal", "Kolkata", 1000),
    ("Orissa", "Puri", 250),
    ("Kerala", "Idukki", 200),
    ("Maharashtra", "Pune", 950),
];

/// District whose final month runs five times its usual volume
const SURGE_DISTRICT: &str = "Sitamarhi";
/// District with demographic updates far outpacing biometric ones
const DIVIDE_DISTRICT: &str = "Nuh";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.months >= 1 && args.months <= 12, "months must be 1..=12");

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut enrolment = writer(&args.output_dir, "api_data_aadhar_enrolment_0_500000.csv")?;
    enrolment.write_record([
        "date", "state", "district", "pincode", "age_0_5", "age_5_17", "age_18_greater",
    ])?;
    let mut biometric = writer(&args.output_dir, "api_data_aadhar_biometric_0_500000.csv")?;
    biometric.write_record(["date", "state", "district", "pincode", "bio_age_5_17", "bio_age_17_"])?;
    let mut demographic = writer(&args.output_dir, "api_data_aadhar_demographic_0_500000.csv")?;
    demographic.write_record(["date", "state", "district", "pincode", "demo_age_5_17", "demo_age_17_"])?;

    let mut rows = 0usize;

    for month in 1..=args.months {
        if month == args.outage_month {
            continue;
        }

        for (i, &(state, district, base)) in DISTRICTS.iter().enumerate() {
            let surge = if district == SURGE_DISTRICT && month == args.months { 5 } else { 1 };
            let pincode = (110_001 + i * 1_000).to_string();
            let (bio_scale, demo_scale) = if district == DIVIDE_DISTRICT {
                (base / 100, base)
            } else {
                (base / 5, base / 8)
            };

            for day in [3, 12, 21] {
                let date = NaiveDate::from_ymd_opt(2025, month, day)
                    .context("invalid sample date")?
                    .format("%d-%m-%Y")
                    .to_string();
                let mut volume = |scale: u64| {
                    let jitter: f64 = rng.gen_range(0.85..1.15);
                    (((scale * surge) as f64 * jitter).round() as u64).to_string()
                };

                let infant = volume(base / 10);
                let school = volume(base / 20);
                let adult = volume(base / 50);
                let bio_school = volume(bio_scale / 2);
                let bio_adult = volume(bio_scale);
                let demo_school = volume(demo_scale / 10);
                let demo_adult = volume(demo_scale);

                let location = [date.as_str(), state, district, pincode.as_str()];
                enrolment.write_record(
                    location.iter().copied().chain([infant.as_str(), school.as_str(), adult.as_str()]),
                )?;
                biometric.write_record(
                    location.iter().copied().chain([bio_school.as_str(), bio_adult.as_str()]),
                )?;
                demographic.write_record(
                    location.iter().copied().chain([demo_school.as_str(), demo_adult.as_str()]),
                )?;

                rows += 3;
            }
        }
    }

    enrolment.flush()?;
    biometric.flush()?;
    demographic.flush()?;

    println!("Wrote {} rows to {}", rows, args.output_dir.display());
    println!("Outage month: {}, surge district: {}, divide district: {}",
        args.outage_month, SURGE_DISTRICT, DIVIDE_DISTRICT);

    Ok(())
}

fn writer(dir: &Path, name: &str) -> anyhow::Result<csv::Writer<std::fs::File>> {
    let path = dir.join(name);
    csv::Writer::from_path(&path).with_context(|| format!("Failed to create {}", path.display()))
}
