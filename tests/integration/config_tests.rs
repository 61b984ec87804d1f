use figment::providers::Serialized;
use figment::{Figment, Jail};
use std::path::{Path, PathBuf};
use wechat_dedup::cli::Cli;
use wechat_dedup::cli::Commands;
use wechat_dedup::config::{Config, ConfigOverrides};

use clap::Parser;

#[test]
fn test_config_load_defaults() {
    // Defaults only, so the environment cannot interfere.
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.min_size, 1);
    assert!(config.roots.is_empty());
    assert!(config.exclude.is_empty());
}

#[test]
fn test_config_file_roots_and_exclude() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "wd.toml",
            r#"
                roots = ["/data/a", "/data/b"]
                exclude = ["Cache/", "*.part"]
            "#,
        )?;

        let config = Config::load(Some(Path::new("wd.toml")), &ConfigOverrides::default())
            .map_err(|e| e.to_string())?;

        assert_eq!(
            config.effective_roots(),
            vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")]
        );
        assert_eq!(config.exclude, vec!["Cache/", "*.part"]);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("wd.toml", "io_threads = 2")?;
        jail.set_env("WECHAT_DEDUP_IO_THREADS", "6");

        let config = Config::load(Some(Path::new("wd.toml")), &ConfigOverrides::default())
            .map_err(|e| e.to_string())?;
        assert_eq!(config.io_threads, 6);
        Ok(())
    });
}

#[test]
fn test_command_line_overrides_env() {
    Jail::expect_with(|jail| {
        jail.create_file("wd.toml", "quarantine_dir = \"/file/q\"")?;
        jail.set_env("WECHAT_DEDUP_IO_THREADS", "6");

        let cli = Cli::try_parse_from([
            "wechat-dedup",
            "scan",
            "--io-threads",
            "3",
            "--ext",
            "PDF,.Doc",
            "--min-size",
            "1KiB",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };

        let config = Config::load(Some(Path::new("wd.toml")), &args.filters.overrides())
            .map_err(|e| e.to_string())?;
        assert_eq!(config.io_threads, 3);
        assert_eq!(config.min_size, 1024);
        assert_eq!(config.extensions, vec!["doc", "pdf"]);
        assert_eq!(config.quarantine_dir, PathBuf::from("/file/q"));
        Ok(())
    });
}

#[test]
fn test_invalid_value_is_reported() {
    Jail::expect_with(|jail| {
        jail.create_file("wd.toml", "min_size = \"lots\"")?;

        let err = Config::load(Some(Path::new("wd.toml")), &ConfigOverrides::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid configuration"));
        Ok(())
    });
}

#[test]
fn test_pipeline_config_always_excludes_quarantine() {
    let config = Config {
        roots: vec![PathBuf::from("/r")],
        quarantine_dir: PathBuf::from("/r/WeChat-Duplicates"),
        ..Config::default()
    };
    let finder = config.to_pipeline_config().finder_config();
    assert_eq!(
        finder.enumerator.excluded_dirs,
        vec![PathBuf::from("/r/WeChat-Duplicates")]
    );
}
