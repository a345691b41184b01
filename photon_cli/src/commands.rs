use crate::config::{GlobalOptions, Settings, StopCommand};
use crate::error::CliError;
use libphoton::{Application, Dictionary};
use log::*;
use photon_client::{
    load_server_properties, DrainOptions, DrainOutcome, Endpoint, FnDelegate, LoopbackPeer, PhotonServer,
    ServerOptions,
};
use std::sync::Arc;
use std::time::Duration;

/// The server the command line points at. Command-line values take precedence over the configuration file.
pub fn endpoint(global: &GlobalOptions, settings: &Settings) -> Result<Endpoint, CliError> {
    let address = global.address.clone().unwrap_or_else(|| settings.address.clone());
    let name = global.application.as_deref().unwrap_or(&settings.application);
    let application = name.parse::<Application>()?;
    let port = match application {
        Application::Master => settings.master_port,
        Application::Game => settings.game_port,
    };
    Ok(Endpoint::new(address, port, application.name()))
}

pub fn server_options(settings: &Settings) -> ServerOptions {
    let mut options = ServerOptions::default()
        .with_service_interval(Duration::from_millis(settings.service_interval_ms))
        .with_debug_level(settings.debug_level);
    if let Some(ms) = settings.connect_timeout_ms {
        options = options.with_connect_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = settings.request_timeout_ms {
        options = options.with_request_timeout(Duration::from_millis(ms));
    }
    options
}

pub fn build_server(global: &GlobalOptions, settings: &Settings) -> Result<PhotonServer<LoopbackPeer>, CliError> {
    let endpoint = endpoint(global, settings)?;
    let peer = LoopbackPeer::new(settings.loopback.clone());
    Ok(PhotonServer::new(peer, endpoint, server_options(settings)))
}

pub fn exec_props(global: &GlobalOptions, settings: &Settings) -> Result<Dictionary, CliError> {
    let server = build_server(global, settings)?;
    info!("Reading properties of {}", server.endpoint());
    let values = load_server_properties(&server)?;
    Ok(values)
}

pub fn exec_stop(cmd: &StopCommand, global: &GlobalOptions, settings: &Settings) -> Result<DrainOutcome, CliError> {
    let server = Arc::new(build_server(global, settings)?);
    server.connect()?;
    let options = DrainOptions::new(cmd.threshold, Duration::from_millis(cmd.timeout_ms))
        .with_update_interval(Duration::from_millis(cmd.interval_ms));
    let delegate = FnDelegate::new(
        |server: &PhotonServer<LoopbackPeer>, _: &()| println!("{} is drained.", server.endpoint()),
        |server: &PhotonServer<LoopbackPeer>, _: &(), message: &str| eprintln!("{}: {message}", server.endpoint()),
    );
    let handle = match server.stop(options, delegate) {
        Ok(handle) => handle,
        Err(err) => {
            server.disconnect();
            return Err(err.into());
        }
    };
    let outcome = handle.join();
    server.disconnect();
    Ok(outcome)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::drain_exit_code;
    use libphoton::codes::ACTORS_COUNT_PROPERTY;
    use libphoton::Value;
    use photon_client::{LoopbackModel, ServerError};

    fn global(application: Option<&str>) -> GlobalOptions {
        GlobalOptions { config_file: None, address: None, application: application.map(str::to_string), json: false }
    }

    fn settings(model: LoopbackModel) -> Settings {
        Settings { service_interval_ms: 1, loopback: model, ..Settings::default() }
    }

    #[test]
    fn endpoint_from_flags_and_settings() {
        let settings = Settings { address: "10.1.1.1".to_string(), master_port: 7000, ..Settings::default() };
        let game = endpoint(&global(None), &settings).unwrap();
        assert_eq!(game.to_string(), "Game@10.1.1.1:6001");
        let master = endpoint(&global(Some("Master")), &settings).unwrap();
        assert_eq!(master.port, 7000);
        let err = endpoint(&global(Some("master")), &settings).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn props_reads_the_loopback_server() {
        let settings = settings(LoopbackModel::with_root("guid-42"));
        let values = exec_props(&global(Some("Game")), &settings).unwrap();
        assert_eq!(values["element"], Value::from("guid-42"));
    }

    #[test]
    fn props_reports_an_invalid_root() {
        let model = LoopbackModel { root_entities: vec![], ..LoopbackModel::default() };
        let err = exec_props(&global(None), &settings(model)).unwrap_err();
        assert!(matches!(err, CliError::Server(ServerError::Validation(_))), "{err}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn stop_drains_the_loopback_server() {
        let mut model = LoopbackModel::with_root("guid-42");
        model.properties.insert(ACTORS_COUNT_PROPERTY.to_string(), Value::from("3"));
        model.actor_counts = vec![2, 0];
        let cmd = StopCommand { threshold: 0, timeout_ms: 5_000, interval_ms: 5 };
        let outcome = exec_stop(&cmd, &global(None), &settings(model)).unwrap();
        assert_eq!(outcome, DrainOutcome::Drained { actors: 0, polls: 2 });
    }

    #[test]
    fn stop_on_an_invalid_root_exits_with_the_validation_code() {
        let model = LoopbackModel { root_entities: vec![], ..LoopbackModel::default() };
        let cmd = StopCommand { threshold: 0, timeout_ms: 5_000, interval_ms: 5 };
        let outcome = exec_stop(&cmd, &global(None), &settings(model)).unwrap();
        assert!(matches!(outcome, DrainOutcome::Failed { validation: true, .. }), "{outcome}");
        assert_eq!(drain_exit_code(&outcome), 2);
    }
}
