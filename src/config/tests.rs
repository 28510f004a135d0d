use std::path::Path;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn feed_defaults_match_listing_behaviour() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(settings.feed.page_size.get(), 10);
    assert_eq!(settings.feed.index_cache_ttl, Duration::from_secs(20));
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(err, LoadError::Invalid { key: "feed.page_size", .. }));
}

#[test]
fn auth_header_is_normalized() {
    let mut raw = RawSettings::default();
    raw.auth.user_header = Some("X-Remote-User".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.user_header.as_str(), "x-remote-user");
    assert_eq!(settings.auth.login_url, "/auth/login/");
}

#[test]
fn relative_login_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.login_url = Some("login".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--feed-index-cache-ttl-seconds",
        "5",
        "--database-url",
        "postgres://override",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.feed_index_cache_ttl_seconds, Some(5));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_group_create_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "--config-file",
        "/etc/yatube.toml",
        "groups",
        "create",
        "--title",
        "Book Club",
        "--database-url",
        "postgres://example",
    ]);

    assert_eq!(args.config_file.as_deref(), Some(Path::new("/etc/yatube.toml")));
    match args.command.expect("groups command") {
        Command::Groups(GroupsCommand::Create(create)) => {
            assert_eq!(create.title, "Book Club");
            assert_eq!(create.slug, None);
            assert_eq!(create.description, "");
            assert_eq!(
                create.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_user_create_arguments() {
    let args = CliArgs::parse_from(["yatube", "users", "create", "leo"]);
    match args.command.expect("users command") {
        Command::Users(UsersCommand::Create(create)) => assert_eq!(create.username, "leo"),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["yatube", "migrate", "--database-url", "postgres://m"]);
    match args.command.expect("migrate command") {
        Command::Migrate(database) => {
            assert_eq!(database.database_url.as_deref(), Some("postgres://m"));
        }
        _ => panic!("wrong command parsed"),
    }
}
