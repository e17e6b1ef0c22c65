// src/cli/args.rs

//! Conversion between commander-style option specs and clap arguments.

use clap::{Arg, ArgAction, ArgMatches};

use crate::core::commands::{CommandOption, ResolvedCommand};
use crate::core::options::{OptionSpec, ParsedOptions};

/// Id of the hidden positional list every plugin command accepts.
pub const POSITIONAL_ID: &str = "__pri_args";

/// The clap argument for one declared option.
pub fn to_arg(spec: &OptionSpec, option: &CommandOption) -> Arg {
    let mut arg = Arg::new(spec.long.clone())
        .long(spec.long.clone())
        .help(option.description.clone());
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }

    match &spec.value_name {
        Some(value_name) if spec.value_required => {
            arg.value_name(value_name.clone()).action(ArgAction::Set)
        }
        Some(value_name) => arg
            .value_name(value_name.clone())
            .action(ArgAction::Set)
            .num_args(0..=1)
            .default_missing_value(""),
        None => arg.action(ArgAction::SetTrue),
    }
}

/// The hidden catch-all for positional arguments.
pub fn positional_arg() -> Arg {
    Arg::new(POSITIONAL_ID)
        .num_args(0..)
        .action(ArgAction::Append)
        .trailing_var_arg(true)
        .hide(true)
}

/// Reads the declared options of `command` back out of clap's matches.
pub fn parsed_options(command: &ResolvedCommand, matches: &ArgMatches) -> ParsedOptions {
    let mut parsed = ParsedOptions::new();
    for (spec, _) in &command.options {
        if spec.takes_value() {
            if let Some(value) = matches.get_one::<String>(&spec.long) {
                parsed = parsed.with_value(spec.long.clone(), value.clone());
            }
        } else if matches.get_flag(&spec.long) {
            parsed = parsed.with_flag(spec.long.clone());
        }
    }
    parsed
}

pub fn positional(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>(POSITIONAL_ID)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn option(flag: &str) -> (OptionSpec, CommandOption) {
        (
            OptionSpec::parse(flag).unwrap(),
            CommandOption {
                flag: flag.to_string(),
                description: "test option".to_string(),
            },
        )
    }

    fn command_with(options: &[(OptionSpec, CommandOption)]) -> Command {
        options
            .iter()
            .fold(Command::new("dev").no_binary_name(true), |cmd, (spec, opt)| {
                cmd.arg(to_arg(spec, opt))
            })
            .arg(positional_arg())
    }

    #[test]
    fn test_value_and_switch_options() {
        let options = vec![option("-p, --port <port>"), option("--open")];
        let matches = command_with(&options)
            .try_get_matches_from(["-p", "3000", "--open", "extra"])
            .unwrap();

        assert_eq!(matches.get_one::<String>("port").map(String::as_str), Some("3000"));
        assert!(matches.get_flag("open"));
        assert_eq!(positional(&matches), vec!["extra"]);
    }

    #[test]
    fn test_optional_value_may_be_omitted() {
        let options = vec![option("--browser [name]")];
        let matches = command_with(&options).try_get_matches_from(["--browser"]).unwrap();
        assert_eq!(matches.get_one::<String>("browser").map(String::as_str), Some(""));
    }

    #[test]
    fn test_required_value_is_enforced() {
        let options = vec![option("-p, --port <port>")];
        assert!(command_with(&options).try_get_matches_from(["--port"]).is_err());
    }
}
