//! CLI argument definitions for `hendrix-deploy`.

use clap::{Args, Parser, Subcommand};

use crate::lifecycle::LifecycleInvocation;
use crate::registry::{ConfigurationName, Port, ServiceIdentity};

/// Starts, stops and restarts supervised hendrix daemons, one per port.
#[derive(Parser, Debug)]
#[command(name = "hendrix-deploy", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) action: Action,
}

/// Lifecycle actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Action {
    /// Starts a daemon on a free port.
    Start(InstanceArgs),
    /// Stops the daemon registered for the port and settings.
    Stop(InstanceArgs),
    /// Stops then starts the daemon with the given entry point.
    Restart(InstanceArgs),
    /// Lists registered instances and whether their processes are alive.
    Status,
}

/// Positional arguments shared by the instance actions.
#[derive(Args, Debug, Clone)]
pub(crate) struct InstanceArgs {
    /// Settings profile passed to the daemon as `--settings`.
    #[arg(value_name = "SETTINGS")]
    pub(crate) settings: ConfigurationName,
    /// WSGI entry point passed to the daemon as `--wsgi`.
    #[arg(value_name = "WSGI")]
    pub(crate) entry_point: String,
    /// Port the daemon binds.
    #[arg(value_name = "PORT")]
    pub(crate) port: Port,
}

impl InstanceArgs {
    fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(self.port, self.settings.clone())
    }
}

impl From<Action> for LifecycleInvocation {
    fn from(action: Action) -> Self {
        match action {
            Action::Start(args) => Self::Start {
                identity: args.identity(),
                entry_point: args.entry_point,
            },
            Action::Stop(args) => Self::Stop {
                identity: args.identity(),
            },
            Action::Restart(args) => Self::Restart {
                identity: args.identity(),
                entry_point: args.entry_point,
            },
            Action::Status => Self::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn start_arguments_build_identity() {
        let cli = Cli::try_parse_from(["hendrix-deploy", "start", "prod", "app.wsgi", "8080"])
            .expect("valid arguments");
        let invocation = LifecycleInvocation::from(cli.action);
        let LifecycleInvocation::Start {
            identity,
            entry_point,
        } = invocation
        else {
            panic!("expected start invocation, got {invocation:?}");
        };
        assert_eq!(identity.port().get(), 8080);
        assert_eq!(identity.configuration().as_str(), "prod");
        assert_eq!(entry_point, "app.wsgi");
    }

    #[test]
    fn stop_discards_entry_point() {
        let cli = Cli::try_parse_from(["hendrix-deploy", "stop", "prod", "app.wsgi", "8080"])
            .expect("valid arguments");
        assert!(matches!(
            LifecycleInvocation::from(cli.action),
            LifecycleInvocation::Stop { .. }
        ));
    }

    #[rstest]
    #[case::missing_port(&["hendrix-deploy", "start", "prod", "app.wsgi"])]
    #[case::zero_port(&["hendrix-deploy", "start", "prod", "app.wsgi", "0"])]
    #[case::port_out_of_range(&["hendrix-deploy", "start", "prod", "app.wsgi", "70000"])]
    #[case::separator_in_settings(&["hendrix-deploy", "start", "my-prod", "app.wsgi", "8080"])]
    #[case::unknown_action(&["hendrix-deploy", "reload", "prod", "app.wsgi", "8080"])]
    #[case::no_action(&["hendrix-deploy"])]
    fn rejects_invalid_arguments(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
