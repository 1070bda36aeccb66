use std::{error::Error, fs, path::Path};

use clap::Parser;
use spacecal_core::Sample;
use spacecal_linear::{fit_calibration, QualityOptions};

/// Offline replay of a recorded calibration session.
///
/// Loads paired pose samples from JSON, runs the closed-form solvers and
/// the quality analyzer, and prints the resulting fit as JSON.
#[derive(Debug, Parser)]
#[command(author, version, about = "Replay a recorded space calibration session")]
struct Args {
    /// Path to JSON file containing the recorded samples.
    #[arg(long)]
    samples: String,

    /// Optional path to JSON QualityOptions. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn run_replay(samples_path: &str, config_path: Option<&str>) -> Result<String, Box<dyn Error>> {
    let samples: Vec<Sample> = load_json_file(Path::new(samples_path))?;

    let opts = if let Some(cfg_path) = config_path {
        load_json_file::<QualityOptions>(Path::new(cfg_path))?
    } else {
        QualityOptions::default()
    };

    let fit = fit_calibration(&samples, &opts)?;
    if fit.sensitivity.reject {
        return Err(format!(
            "rejecting low quality calibration (RMS error {:.3} m)",
            fit.sensitivity.base_error
        )
        .into());
    }

    Ok(serde_json::to_string_pretty(&fit)?)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let json = run_replay(&args.samples, args.config.as_deref())?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacecal_core::synthetic::{attached_samples, sweep_poses};
    use spacecal_core::{euler_zyx_from_mat, euler_zyx_to_quat, quat_to_mat, Mat3, Vec3};
    use spacecal_linear::CalibrationFit;
    use std::path::PathBuf;

    fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn synthetic_samples() -> (Vec<Sample>, Vec3, Vec3) {
        let universe_euler = Vec3::new(30.0, 20.0, 0.0);
        let universe_rot = quat_to_mat(&euler_zyx_to_quat(&universe_euler));
        let universe_trans = Vec3::new(0.10, 0.20, -0.05);

        let samples = attached_samples(
            &sweep_poses(20, 0.45, 0.3),
            &universe_rot,
            &universe_trans,
            &Mat3::identity(),
            &Vec3::new(0.0, 0.1, 0.05),
        );
        (samples, euler_zyx_from_mat(&universe_rot), universe_trans)
    }

    #[test]
    fn replay_recovers_recorded_session() {
        let dir = tempfile::tempdir().unwrap();
        let (samples, expected_euler, expected_trans) = synthetic_samples();
        let samples_path = write_json(dir.path(), "samples.json", &samples);

        let json = run_replay(samples_path.to_str().unwrap(), None).unwrap();
        let fit: CalibrationFit = serde_json::from_str(&json).unwrap();

        assert!((fit.rotation_deg - expected_euler).norm() < 0.5);
        assert!((fit.translation_cm - expected_trans * 100.0).norm() < 0.5);
        assert!(!fit.sensitivity.reject);
    }

    #[test]
    fn replay_honors_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let (samples, _, _) = synthetic_samples();
        let samples_path = write_json(dir.path(), "samples.json", &samples);

        // An impossible error limit forces a rejection.
        let config = QualityOptions {
            error_limit: 0.0,
            ..Default::default()
        };
        let config_path = write_json(dir.path(), "config.json", &config);

        let err = run_replay(
            samples_path.to_str().unwrap(),
            Some(config_path.to_str().unwrap()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("low quality"));
    }

    #[test]
    fn missing_samples_file_is_an_error() {
        assert!(run_replay("/nonexistent/samples.json", None).is_err());
    }
}
