//! CLI integration tests.
//!
//! Tests cover:
//! - Threshold and request building from INI files (build_thresholds,
//!   build_screen_request) including command-line overrides
//! - Source selection (open_source)
//! - Validate, screen and days commands against CSV fixtures on disk

mod common;

use barscreen::adapters::file_config_adapter::FileConfigAdapter;
use barscreen::cli::{self, Cli, Command, ScreenOverrides};
use barscreen::domain::error::ScreenerError;
use barscreen::domain::filter_engine::Logic;
use barscreen::domain::predicate::FilterKind;
use clap::Parser;
use common::*;
use std::io::Write;
use std::process::ExitCode;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode has no PartialEq; compare the Debug rendering instead.
fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

const BARS_CSV: &str = "\
date,ticker,name,open,high,low,close,volume,value,change_rate
20250710,000010,알파,1000,1000,1000,1000,10,100,-1.0
20250711,000010,알파,1000,1000,1000,1000,10,300,2.0
20250710,000020,베타,1000,1000,1000,1000,10,100,1.0
20250711,000020,베타,1000,1000,1000,1000,10,900,1.0
20250711,000030,감마스팩,1000,1000,1000,1000,10,500,3.0
20250714,000030,감마스팩,1000,1000,1000,0,0,0,
";

fn csv_config(csv_path: &std::path::Path, screen: &str) -> String {
    format!(
        "[csv]\npath = {}\n\n[screen]\n{}\n\n[logging]\nlevel = error\n",
        csv_path.display(),
        screen
    )
}

mod request_building {
    use super::*;

    #[test]
    fn thresholds_default_when_section_missing() {
        let adapter = FileConfigAdapter::from_string("[screen]\n").unwrap();
        let th = cli::build_thresholds(&adapter).unwrap();
        assert_eq!(th.min_value, 5e10);
        assert_eq!(th.max_runup, 3.0);
        assert_eq!(th.min_close, 1_000.0);
        assert_eq!(th.shell_marker, "스팩");
        assert_eq!(th.common_suffix, '0');
        assert_eq!(th.min_market_cap, 1e11);
        assert_eq!(th.min_operating_income, 0.0);
    }

    #[test]
    fn thresholds_read_from_config() {
        let ini = r#"
[thresholds]
min_value = 15000000000
max_runup = 2.5
min_close = 500
common_suffix = 5
min_market_cap = 100000000000
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let th = cli::build_thresholds(&adapter).unwrap();
        assert_eq!(th.min_value, 1.5e10);
        assert_eq!(th.max_runup, 2.5);
        assert_eq!(th.min_close, 500.0);
        assert_eq!(th.common_suffix, '5');
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[thresholds]\nmax_runup = -1\n").unwrap();
        let err = cli::build_thresholds(&adapter).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigInvalid { key, .. } if key == "max_runup"));
    }

    #[test]
    fn non_numeric_thresholds_are_rejected_not_defaulted() {
        let adapter =
            FileConfigAdapter::from_string("[thresholds]\nmax_runup = 2배\nmin_value = 100억\n")
                .unwrap();
        let err = cli::build_thresholds(&adapter).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigInvalid { ref section, .. } if section == "thresholds"));

        let adapter = FileConfigAdapter::from_string("[thresholds]\nmax_runup = NaN\n").unwrap();
        let err = cli::build_thresholds(&adapter).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigInvalid { key, .. } if key == "max_runup"));
    }

    #[test]
    fn operating_income_threshold_is_read() {
        let adapter =
            FileConfigAdapter::from_string("[thresholds]\nmin_operating_income = -1e9\n").unwrap();
        let th = cli::build_thresholds(&adapter).unwrap();
        assert_eq!(th.min_operating_income, -1e9);
    }

    #[test]
    fn request_from_config() {
        let ini = r#"
[screen]
start_date = 20250102
end_date = 2025-07-14
window_days = 120
filters = pos0 AND neg1 OR quality
exclude_spc = true

[thresholds]
min_value = 15000000000
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let req = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap();
        assert_eq!(req.start, Some(date(2025, 1, 2)));
        assert_eq!(req.end, Some(date(2025, 7, 14)));
        assert_eq!(req.window_days, 120);
        assert!(req.exclude_spc);
        let chain: Vec<(FilterKind, Logic)> =
            req.filters.iter().map(|f| (f.kind, f.logic)).collect();
        assert_eq!(
            chain,
            vec![
                (FilterKind::Positive(0), Logic::And),
                (FilterKind::Negative(1), Logic::And),
                (FilterKind::Quality, Logic::Or),
            ]
        );
        assert_eq!(req.thresholds.min_value, 1.5e10);
    }

    #[test]
    fn overrides_win_over_config() {
        let ini = "[screen]\nend_date = 2025-07-14\nfilters = quality\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let overrides = ScreenOverrides {
            start: Some(date(2025, 7, 1)),
            end: Some(date(2025, 7, 11)),
            filters: Some("neg0".into()),
            exclude_spc: Some(true),
        };
        let req = cli::build_screen_request(&adapter, &overrides).unwrap();
        assert_eq!(req.start, Some(date(2025, 7, 1)));
        assert_eq!(req.end, Some(date(2025, 7, 11)));
        assert_eq!(req.filters.len(), 1);
        assert_eq!(req.filters[0].kind, FilterKind::Negative(0));
        assert!(req.exclude_spc);
        assert_eq!(cli::filter_text(&adapter, &overrides), "neg0");
    }

    #[test]
    fn command_line_can_switch_exclusion_off() {
        let adapter = FileConfigAdapter::from_string("[screen]\nexclude_spc = true\n").unwrap();
        let req = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap();
        assert!(req.exclude_spc);

        let overrides = ScreenOverrides {
            exclude_spc: Some(false),
            ..ScreenOverrides::default()
        };
        let req = cli::build_screen_request(&adapter, &overrides).unwrap();
        assert!(!req.exclude_spc);
    }

    #[test]
    fn exclusion_flags_parse_last_one_wins() {
        let parsed = Cli::try_parse_from([
            "barscreen",
            "screen",
            "-c",
            "cfg.ini",
            "--exclude-spc",
            "--no-exclude-spc",
        ])
        .unwrap();
        match parsed.command {
            Command::Screen {
                exclude_spc,
                no_exclude_spc,
                ..
            } => {
                assert!(!exclude_spc);
                assert!(no_exclude_spc);
            }
            other => panic!("expected screen, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_window_days_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[screen]\nwindow_days = abc\n").unwrap();
        let err = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigInvalid { key, .. } if key == "window_days"));
    }

    #[test]
    fn defaults_without_screen_section() {
        let adapter = FileConfigAdapter::from_string("[csv]\npath = x.csv\n").unwrap();
        let req = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap();
        assert_eq!(req.start, None);
        assert_eq!(req.end, None);
        assert_eq!(req.window_days, 200);
        assert!(req.filters.is_empty());
        assert!(!req.exclude_spc);
    }

    #[test]
    fn bad_chain_is_filter_parse_error() {
        let adapter =
            FileConfigAdapter::from_string("[screen]\nfilters = pos0 AND momentum\n").unwrap();
        let err = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap_err();
        match err {
            ScreenerError::FilterParse(e) => assert_eq!(e.position, 9),
            other => panic!("expected FilterParse, got {other:?}"),
        }
    }

    #[test]
    fn window_days_must_be_positive() {
        let adapter = FileConfigAdapter::from_string("[screen]\nwindow_days = 0\n").unwrap();
        let err = cli::build_screen_request(&adapter, &ScreenOverrides::default()).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigInvalid { key, .. } if key == "window_days"));
    }

    #[test]
    fn date_arguments_accept_both_forms() {
        assert_eq!(cli::parse_date_arg("2025-07-14"), Ok(date(2025, 7, 14)));
        assert_eq!(cli::parse_date_arg("20250714"), Ok(date(2025, 7, 14)));
        assert!(cli::parse_date_arg("14/07/2025").is_err());
    }
}

mod source_selection {
    use super::*;

    #[test]
    fn csv_path_selects_csv_source() {
        let csv = write_temp(BARS_CSV);
        let adapter =
            FileConfigAdapter::from_string(&csv_config(csv.path(), "")).unwrap();
        let source = cli::open_source(&adapter).unwrap();
        let range = source.data_range().unwrap().unwrap();
        assert_eq!(range.first, date(2025, 7, 10));
        assert_eq!(range.last, date(2025, 7, 11));
        assert_eq!(range.tickers, 3);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_requires_path() {
        let adapter = FileConfigAdapter::from_string("[sqlite]\npool_size = 2\n").unwrap();
        let err = cli::open_source(&adapter).err().unwrap();
        assert!(matches!(err, ScreenerError::ConfigMissing { section, .. } if section == "sqlite"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let csv = write_temp(BARS_CSV);
        let ini = write_temp(&csv_config(csv.path(), "filters = pos0 AND neg1"));
        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn validate_rejects_bad_chain_with_parse_exit_code() {
        let ini = write_temp("[screen]\nfilters = pos0 XOR neg1\n");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let code = cli::run(Cli {
            command: Command::Validate {
                config: "/nonexistent/barscreen.ini".into(),
            },
        });
        assert!(same_code(code, ExitCode::from(1)));
    }

    #[test]
    fn screen_writes_json_report() {
        let csv = write_temp(BARS_CSV);
        let ini = write_temp(&csv_config(csv.path(), "filters = pos0 AND neg1"));
        let out = tempfile::NamedTempFile::new().unwrap();

        let code = cli::run(Cli {
            command: Command::Screen {
                config: ini.path().to_path_buf(),
                start: None,
                end: None,
                filters: None,
                exclude_spc: false,
                no_exclude_spc: false,
                json: true,
                output: Some(out.path().to_path_buf()),
            },
        });
        assert!(same_code(code, ExitCode::SUCCESS));

        let text = std::fs::read_to_string(out.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["end"], "2025-07-11");
        assert_eq!(value["recommended"], serde_json::json!(["000010"]));
        assert_eq!(value["counts"][0]["count"], 3);
        assert_eq!(value["counts"][1]["count"], 1);
        assert_eq!(value["summary"], "[D-0 양봉]AND [D-1 음봉]AND");
    }

    #[test]
    fn screen_text_report_with_overrides() {
        let csv = write_temp(BARS_CSV);
        let ini = write_temp(&csv_config(csv.path(), "filters = quality"));
        let out = tempfile::NamedTempFile::new().unwrap();

        let code = cli::run(Cli {
            command: Command::Screen {
                config: ini.path().to_path_buf(),
                start: None,
                end: Some(date(2025, 7, 11)),
                filters: Some("pos0".into()),
                exclude_spc: true,
                no_exclude_spc: false,
                json: false,
                output: Some(out.path().to_path_buf()),
            },
        });
        assert!(same_code(code, ExitCode::SUCCESS));

        let text = std::fs::read_to_string(out.path()).unwrap();
        assert!(text.contains("Recommended: 2"));
        assert!(text.contains("000020"));
        assert!(text.contains("000010"));
        assert!(!text.contains("감마스팩"));
        // ranked by traded value: 000020 (900) before 000010 (300)
        let first = text.find("000020").unwrap();
        let second = text.find("000010").unwrap();
        assert!(first < second);
    }

    #[test]
    fn screen_empty_range_exits_with_data_code() {
        let csv = write_temp(BARS_CSV);
        let ini = write_temp(&csv_config(
            csv.path(),
            "start_date = 2025-01-01\nend_date = 2025-01-31",
        ));
        let code = cli::run(Cli {
            command: Command::Screen {
                config: ini.path().to_path_buf(),
                start: None,
                end: None,
                filters: None,
                exclude_spc: false,
                no_exclude_spc: false,
                json: false,
                output: None,
            },
        });
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn days_and_info_succeed() {
        let csv = write_temp(BARS_CSV);
        let ini = write_temp(&csv_config(csv.path(), ""));
        let days = cli::run(Cli {
            command: Command::Days {
                config: ini.path().to_path_buf(),
                end: None,
                count: 2,
            },
        });
        assert!(same_code(days, ExitCode::SUCCESS));
        let info = cli::run(Cli {
            command: Command::Info {
                config: ini.path().to_path_buf(),
            },
        });
        assert!(same_code(info, ExitCode::SUCCESS));
    }
}
