//! Integration tests for the `example run` command.
use elmarkets::cli::RunOpts;
use elmarkets::cli::example::handle_example_run_command;
use elmarkets::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("ELMARKETS_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    handle_example_run_command("district", &opts, Some(Settings::default())).unwrap();

    for scenario in ["baseline", "day_ahead_x2", "future_base_x3", "future_peak_x3"] {
        assert!(
            tempdir
                .path()
                .join(format!("flows_{scenario}.csv"))
                .is_file()
        );
    }
}
