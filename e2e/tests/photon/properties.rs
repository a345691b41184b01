use crate::photon::PhotonWorld;
use cucumber::{given, then, when};
use libphoton::Value;
use log::*;

#[given(expr = "a game server with root component {string}")]
fn one_root(world: &mut PhotonWorld, entity: String) {
    world.model.root_entities = vec![entity];
}

#[given(expr = "a game server with root components {string} and {string}")]
fn two_roots(world: &mut PhotonWorld, first: String, second: String) {
    world.model.root_entities = vec![first, second];
}

#[given(expr = "the server reports property {string} as {string}")]
fn server_property(world: &mut PhotonWorld, key: String, value: String) {
    world.model.properties.insert(key, Value::from(value));
}

#[given(expr = "the server refuses property lookups with return code {int}")]
fn refuse_properties(world: &mut PhotonWorld, code: i16) {
    world.model.properties_return_code = code;
}

#[when("the administrator reads the server properties")]
async fn read_properties(world: &mut PhotonWorld) {
    let result = world.client().read_properties().await;
    match result {
        Ok(values) => world.properties = Some(values),
        Err(err) => {
            error!("Property query task failed: {err}");
            world.last_error = Some(err.to_string());
        }
    }
}

#[then(expr = "property {string} is {string}")]
fn property_is(world: &mut PhotonWorld, key: String, expected: String) {
    assert_eq!(world.last_error, None, "the property query task failed");
    let values = world.properties.as_ref().expect("no property query ran").as_ref().expect("no properties returned");
    let value = values.get(&key).unwrap_or_else(|| panic!("property {key} is missing"));
    assert_eq!(value.to_string(), expected);
}

#[then("no properties are returned")]
fn no_properties(world: &mut PhotonWorld) {
    assert_eq!(world.last_error, None, "the property query task failed");
    let values = world.properties.as_ref().expect("no property query ran");
    assert!(values.is_none(), "unexpected properties: {values:?}");
}

#[then("the client is disconnected")]
fn client_disconnected(world: &mut PhotonWorld) {
    let client = world.client.as_ref().expect("no client");
    assert!(!client.is_connected());
    assert!(client.probe().disconnect_calls() >= 1, "the peer was never closed");
}
