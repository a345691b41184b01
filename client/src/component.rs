//! The administration operations, each validated against the shape the server is expected to answer with.

use crate::connection::Connection;
use crate::errors::{ServerError, ValidationError};
use libphoton::codes::{
    ACTORS_COUNT_PROPERTY, OPERATION_RESULT_OK, OP_GET_PROPERTIES, OP_INVOKE_OPERATION, OP_LIST_ROOT,
    PARAM_ARGUMENT, PARAM_OPERATIONS, PARAM_VALUES,
};
use libphoton::{Dictionary, OperationResponse, Params, PhotonPeer, Value};
use log::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque reference to a remote component, as returned by the root lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef(String);

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Property values of a component, plus the names of the operations it supports when the server lists them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProperties {
    pub values: Dictionary,
    pub operations: Option<Vec<String>>,
}

impl ComponentProperties {
    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.as_ref().is_some_and(|ops| ops.iter().any(|op| op == name))
    }

    /// The number of actors the component still hosts.
    pub fn actors_count(&self) -> Option<i64> {
        self.values.get(ACTORS_COUNT_PROPERTY).and_then(Value::as_i64)
    }
}

fn expect_success(operation: &str, response: &OperationResponse) -> Result<(), ValidationError> {
    if response.is_ok() {
        Ok(())
    } else {
        Err(ValidationError::BadResponse { operation: operation.to_string(), response: response.to_string() })
    }
}

fn expect_param<'r>(operation: &str, response: &'r OperationResponse, key: u8) -> Result<&'r Value, ValidationError> {
    response.param(key).ok_or_else(|| ValidationError::MissingParameter {
        operation: operation.to_string(),
        key,
        response: response.to_string(),
    })
}

/// Extract the single root component from a root lookup response.
pub fn root_entity(response: &OperationResponse) -> Result<EntityRef, ValidationError> {
    const OPERATION: &str = "Get game server";
    expect_success(OPERATION, response)?;
    let result = response.param(PARAM_VALUES).ok_or_else(|| ValidationError::BadResponse {
        operation: OPERATION.to_string(),
        response: response.to_string(),
    })?;
    match result.as_dictionary() {
        Some(root) if root.len() == 1 => {
            let id = root.keys().next().cloned().unwrap_or_default();
            Ok(EntityRef(id))
        }
        _ => Err(ValidationError::UnexpectedShape(format!("Invalid root element: {result}"))),
    }
}

/// Extract values (and operation names, when `require_operations` is set) from a properties response.
pub fn component_properties(
    response: &OperationResponse,
    require_operations: bool,
) -> Result<ComponentProperties, ValidationError> {
    const OPERATION: &str = "Get properties";
    expect_success(OPERATION, response)?;
    let values = expect_param(OPERATION, response, PARAM_VALUES)?;
    let values = values
        .as_dictionary()
        .cloned()
        .ok_or_else(|| ValidationError::UnexpectedShape(format!("Invalid property values: {values}")))?;
    let operations = if require_operations {
        let names = expect_param(OPERATION, response, PARAM_OPERATIONS)?;
        let names = names
            .to_string_list()
            .ok_or_else(|| ValidationError::UnexpectedShape(format!("Invalid operation names: {names}")))?;
        Some(names)
    } else {
        response.param(PARAM_OPERATIONS).and_then(Value::to_string_list)
    };
    Ok(ComponentProperties { values, operations })
}

/// Check the result code of an invoked operation.
pub fn operation_result(name: &str, response: &OperationResponse) -> Result<i64, ValidationError> {
    expect_success(name, response)?;
    match response.param(PARAM_OPERATIONS).and_then(Value::as_i64) {
        Some(OPERATION_RESULT_OK) => Ok(OPERATION_RESULT_OK),
        _ => Err(ValidationError::UnexpectedShape(format!("Error in '{name}' operation: {response}"))),
    }
}

impl<P: PhotonPeer> Connection<P> {
    /// Look up the root component of the server application. Exactly one must exist.
    pub fn resolve_root(&self) -> Result<EntityRef, ServerError> {
        let response = self.sync_request(OP_LIST_ROOT, Params::from([(PARAM_ARGUMENT, Value::Null)]))?;
        let entity = root_entity(&response)?;
        debug!("Root component of {} is {entity}", self.endpoint());
        Ok(entity)
    }

    /// Load the property values of `entity`.
    pub fn load_properties(&self, entity: &EntityRef) -> Result<ComponentProperties, ServerError> {
        self.fetch_properties(entity, false)
    }

    /// Load the property values of `entity` together with the operations it supports.
    pub fn load_component(&self, entity: &EntityRef) -> Result<ComponentProperties, ServerError> {
        self.fetch_properties(entity, true)
    }

    fn fetch_properties(
        &self,
        entity: &EntityRef,
        require_operations: bool,
    ) -> Result<ComponentProperties, ServerError> {
        let params = Params::from([(PARAM_ARGUMENT, Value::from(entity.as_str()))]);
        let response = self.sync_request(OP_GET_PROPERTIES, params)?;
        let properties = component_properties(&response, require_operations)?;
        trace!("{} properties loaded for {entity}", properties.values.len());
        Ok(properties)
    }

    /// Invoke the operation `name` on `entity` and check that it reports success.
    pub fn invoke_operation(&self, entity: &EntityRef, name: &str, args: Dictionary) -> Result<i64, ServerError> {
        let params = Params::from([
            (PARAM_ARGUMENT, Value::from(entity.as_str())),
            (PARAM_VALUES, Value::from(name)),
            (PARAM_OPERATIONS, Value::Dictionary(args)),
        ]);
        let response = self.sync_request(OP_INVOKE_OPERATION, params)?;
        let result = operation_result(name, &response)?;
        debug!("Operation '{name}' on {entity} succeeded");
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn root_response(entities: &[&str]) -> OperationResponse {
        let root: Dictionary = entities.iter().map(|e| (e.to_string(), Value::empty_dictionary())).collect();
        OperationResponse::ok(OP_LIST_ROOT, Params::new()).with_param(PARAM_VALUES, root)
    }

    #[test]
    fn root_with_exactly_one_entity() {
        let entity = root_entity(&root_response(&["guid-123"])).unwrap();
        assert_eq!(entity.as_str(), "guid-123");
    }

    #[test]
    fn root_with_zero_or_many_entities_is_rejected() {
        let err = root_entity(&root_response(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid root element: {}");
        let err = root_entity(&root_response(&["a", "b"])).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedShape(_)));
        let not_a_map = OperationResponse::ok(OP_LIST_ROOT, Params::new()).with_param(PARAM_VALUES, "guid");
        assert!(root_entity(&not_a_map).is_err());
    }

    #[test]
    fn root_failures_carry_the_raw_response() {
        let failed = OperationResponse::failed(OP_LIST_ROOT, -1, "denied");
        let err = root_entity(&failed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Get game server operation error OperationResponse 10: ReturnCode: -1 (denied). Parameters: {}"
        );
        let missing = OperationResponse::ok(OP_LIST_ROOT, Params::new());
        assert!(matches!(root_entity(&missing), Err(ValidationError::BadResponse { .. })));
    }

    fn props_response() -> OperationResponse {
        let values = Dictionary::from([(ACTORS_COUNT_PROPERTY.to_string(), Value::from("5"))]);
        OperationResponse::ok(OP_GET_PROPERTIES, Params::new()).with_param(PARAM_VALUES, values)
    }

    #[test]
    fn properties_with_and_without_operations() {
        let res = props_response();
        let props = component_properties(&res, false).unwrap();
        assert_eq!(props.actors_count(), Some(5));
        assert!(props.operations.is_none());
        assert!(!props.has_operation("Reset"));

        let err = component_properties(&res, true).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter { key: PARAM_OPERATIONS, .. }));

        let res = res.with_param(PARAM_OPERATIONS, vec!["Reset".to_string(), "Ping".to_string()]);
        let props = component_properties(&res, true).unwrap();
        assert!(props.has_operation("Reset"));
        assert!(props.has_operation("Ping"));
    }

    #[test]
    fn properties_need_values() {
        let res = OperationResponse::ok(OP_GET_PROPERTIES, Params::new());
        let err = component_properties(&res, false).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter { key: PARAM_VALUES, .. }));
        let res = OperationResponse::failed(OP_GET_PROPERTIES, 2, "no such element");
        assert!(matches!(component_properties(&res, false), Err(ValidationError::BadResponse { .. })));
    }

    #[test]
    fn operation_result_codes() {
        let ok = OperationResponse::ok(OP_INVOKE_OPERATION, Params::new()).with_param(PARAM_OPERATIONS, 1i64);
        assert_eq!(operation_result("Reset", &ok).unwrap(), 1);
        let refused = OperationResponse::ok(OP_INVOKE_OPERATION, Params::new()).with_param(PARAM_OPERATIONS, 0i64);
        let err = operation_result("Reset", &refused).unwrap_err();
        assert!(err.to_string().starts_with("Error in 'Reset' operation"));
        let failed = OperationResponse::failed(OP_INVOKE_OPERATION, -1, "boom");
        assert!(operation_result("Reset", &failed).unwrap_err().to_string().starts_with("Reset operation error"));
    }
}
