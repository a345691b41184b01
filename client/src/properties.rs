use crate::errors::ServerError;
use crate::server::PhotonServer;
use libphoton::{Dictionary, PhotonPeer};
use log::*;

/// Connect, read the root component's property values, and disconnect again.
///
/// The server is disconnected on every path, including failures after the connection was made.
pub fn load_server_properties<P: PhotonPeer, D>(server: &PhotonServer<P, D>) -> Result<Dictionary, ServerError> {
    server.connect()?;
    let result = read_root_properties(server);
    server.disconnect();
    result
}

fn read_root_properties<P: PhotonPeer, D>(server: &PhotonServer<P, D>) -> Result<Dictionary, ServerError> {
    let connection = server.connection();
    let entity = connection.resolve_root()?;
    let properties = connection.load_properties(&entity)?;
    debug!("Read {} properties of {entity} from {}", properties.values.len(), server.endpoint());
    Ok(properties.values)
}

/// As [`load_server_properties`], but a failure is logged and `None` returned.
pub fn get_server_properties<P: PhotonPeer, D>(server: &PhotonServer<P, D>) -> Option<Dictionary> {
    match load_server_properties(server) {
        Ok(values) => Some(values),
        Err(err) => {
            error!("Could not read the properties of {}. {err}", server.endpoint());
            None
        }
    }
}
