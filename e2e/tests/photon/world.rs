use cucumber::World;
use e2e::{AdminClient, DrainReport};
use libphoton::Dictionary;
use log::*;
use photon_client::LoopbackModel;

#[derive(Debug, Default, World)]
pub struct PhotonWorld {
    /// The server behaviour for the scenario. Frozen once the client is created.
    pub model: LoopbackModel,
    pub client: Option<AdminClient>,
    /// `Some(None)` when the property query ran and failed.
    pub properties: Option<Option<Dictionary>>,
    pub drain: Option<DrainReport>,
    /// Set when the property query task itself failed, as opposed to the query returning nothing.
    pub last_error: Option<String>,
}

impl PhotonWorld {
    /// The scenario's client, created from the model on first use.
    pub fn client(&mut self) -> &AdminClient {
        if self.client.is_none() {
            info!("Creating the admin client for {:?}", self.model.root_entities);
            self.client = Some(AdminClient::new(self.model.clone()));
        }
        self.client.as_ref().expect("client was just created")
    }

    pub fn drain_report(&self) -> &DrainReport {
        self.drain.as_ref().expect("the drain has not run")
    }
}
