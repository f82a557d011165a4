pub mod auth;
pub mod logging;
pub mod messaging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("careline")
        .about("Patient communication portal")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("CARELINE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("CARELINE_DSN")
                .required(true),
        );

    let command = auth::with_args(command);
    let command = messaging::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "careline",
            "--dsn",
            "postgres://localhost:5432/careline",
            "--session-secret",
            "0123456789abcdef",
        ]
    }

    #[test]
    fn defaults_apply() {
        let matches = new().try_get_matches_from(base_args()).unwrap();
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
        assert_eq!(
            matches.get_one::<String>("messaging-mode").map(String::as_str),
            Some("demo")
        );
        assert_eq!(
            matches.get_one::<i64>("session-ttl-seconds").copied(),
            Some(604_800)
        );
    }

    #[test]
    fn dsn_is_required() {
        temp_env::with_vars([("CARELINE_DSN", None::<&str>)], || {
            let result = new().try_get_matches_from(vec![
                "careline",
                "--session-secret",
                "0123456789abcdef",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn port_can_be_overridden() {
        let mut args = base_args();
        args.extend(["--port", "9090"]);
        let matches = new().try_get_matches_from(args).unwrap();
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
    }
}
