use crate::config::endpoint::Endpoint;
use crate::config::settings::Settings;
use crate::device::engine::DeviceSimulator;
use crate::device::store::{SimResult, VariableStore};
use crate::device::structures::{SimValue, SimulatedVariable};
use async_trait::async_trait;
use opcua::server::address_space::{NodeType, VariableBuilder};
use opcua::server::diagnostics::NamespaceMetadata;
use opcua::server::node_manager::memory::{simple_node_manager, SimpleNodeManager};
use opcua::server::{
    Server, ServerBuilder, ServerEndpoint, ServerHandle, SubscriptionCache,
    ANONYMOUS_USER_TOKEN_ID,
};
use opcua::types::{
    DataEncoding, DataTypeId, DataValue, NodeId, NumericRange, TimestampsToReturn, Variant,
};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Everything the rest of the process needs from a built server: its handle,
/// the resolved namespace index and a store over the three variable nodes.
pub struct SimulatorContext {
    pub handle: ServerHandle,
    pub namespace_index: u16,
    pub endpoint: Endpoint,
    store: Arc<OpcUaStore>,
}

impl SimulatorContext {
    pub fn store(&self) -> Arc<OpcUaStore> {
        Arc::clone(&self.store)
    }

    pub fn node_id(&self, variable: SimulatedVariable) -> NodeId {
        self.store.node_id(variable)
    }

    /// Stop accepting connections and release the endpoint.
    pub fn shutdown(&self) {
        info!("Shutting down OPC UA server on {}", self.endpoint);
        self.handle.cancel();
    }
}

/// Build the server, register the namespace and create the three writable
/// variables under the Objects folder. The server is not listening yet, see
/// [`serve`].
pub fn build_server(settings: &Settings) -> SimResult<(Server, SimulatorContext)> {
    let endpoint = settings.endpoint()?;
    let namespace_uri = settings.server.namespace_uri.as_str();
    let user_token_ids = vec![ANONYMOUS_USER_TOKEN_ID.to_string()];

    let (server, handle) = ServerBuilder::new_anonymous(settings.server.server_name.as_str())
        .host(endpoint.host.as_str())
        .port(endpoint.port)
        .add_endpoint(
            "none",
            ServerEndpoint::new_none(&endpoint.path, &user_token_ids),
        )
        .discovery_urls(vec![endpoint.path.clone()])
        .with_node_manager(simple_node_manager(
            NamespaceMetadata {
                namespace_uri: namespace_uri.to_string(),
                ..Default::default()
            },
            "simulator",
        ))
        .build()
        .map_err(|e| format!("Failed to build OPC UA server: {}", e))?;

    let node_manager = handle
        .node_managers()
        .get_of_type::<SimpleNodeManager>()
        .ok_or("Simple node manager missing from server")?;
    let namespace_index = handle
        .get_namespace_index(namespace_uri)
        .ok_or_else(|| format!("Namespace '{}' was not registered", namespace_uri))?;
    info!("Registered namespace {} as index {}", namespace_uri, namespace_index);

    let store = Arc::new(OpcUaStore {
        namespace_index,
        node_manager,
        subscriptions: Arc::clone(handle.subscriptions()),
    });

    let simulation = &settings.simulation;
    let initial_values = [
        (
            SimulatedVariable::Temperature,
            DataTypeId::Double,
            Variant::Double(simulation.temperature.initial),
        ),
        (
            SimulatedVariable::Pressure,
            DataTypeId::Double,
            Variant::Double(simulation.pressure.initial),
        ),
        (
            SimulatedVariable::Counter,
            DataTypeId::Int32,
            Variant::Int32(simulation.counter_initial),
        ),
    ];
    {
        let mut space = store.node_manager.address_space().write();
        for (variable, data_type, value) in initial_values {
            let node_id = store.node_id(variable);
            let inserted = VariableBuilder::new(&node_id, variable.name(), variable.name())
                .data_type(data_type)
                .value(value)
                .writable()
                .organized_by(NodeId::objects_folder_id())
                .insert(&mut *space);
            if !inserted {
                return Err(format!("Failed to add variable node {}", node_id).into());
            }
            info!("Added writable variable {} ({})", variable, node_id);
        }
    }

    Ok((
        server,
        SimulatorContext {
            handle,
            namespace_index,
            endpoint,
            store,
        },
    ))
}

/// Start accepting connections on a background task.
pub fn serve(server: Server) -> JoinHandle<SimResult<()>> {
    tokio::spawn(async move {
        server
            .run()
            .await
            .map_err(|e| format!("OPC UA server failed: {}", e).into())
    })
}

/// Run the device loop for as long as the server task is alive.
///
/// If the server exits first (a bind failure, for instance) its error is
/// returned and the loop is dropped. Otherwise the loop runs until `shutdown`
/// resolves or a tick fails, after which the server is cancelled and awaited.
pub async fn run_device_loop<S, F>(
    context: &SimulatorContext,
    mut server_task: JoinHandle<SimResult<()>>,
    simulator: &mut DeviceSimulator<S>,
    shutdown: F,
) -> SimResult<u64>
where
    S: VariableStore,
    F: Future<Output = ()>,
{
    let loop_result = tokio::select! {
        joined = &mut server_task => {
            return Err(match joined {
                Ok(Ok(())) => "OPC UA server stopped unexpectedly".into(),
                Ok(Err(e)) => e,
                Err(e) => format!("OPC UA server task panicked: {}", e).into(),
            });
        }
        result = simulator.run_until(shutdown) => result,
    };

    context.shutdown();
    match server_task.await {
        Ok(Ok(())) => info!("OPC UA server stopped."),
        Ok(Err(e)) => error!("{}", e),
        Err(e) => error!("OPC UA server task panicked: {}", e),
    }
    loop_result
}

/// [`VariableStore`] backed by the server's address space.
pub struct OpcUaStore {
    namespace_index: u16,
    node_manager: Arc<SimpleNodeManager>,
    subscriptions: Arc<SubscriptionCache>,
}

impl OpcUaStore {
    pub fn node_id(&self, variable: SimulatedVariable) -> NodeId {
        NodeId::new(self.namespace_index, variable.name())
    }

    fn variant_to_sim_value(node_id: &NodeId, variant: &Variant) -> SimResult<SimValue> {
        let value = match variant {
            Variant::Double(d) => SimValue::Float(*d),
            Variant::Float(f) => SimValue::Float(*f as f64),
            Variant::SByte(i) => SimValue::Int(*i as i32),
            Variant::Byte(u) => SimValue::Int(*u as i32),
            Variant::Int16(i) => SimValue::Int(*i as i32),
            Variant::UInt16(u) => SimValue::Int(*u as i32),
            Variant::Int32(i) => SimValue::Int(*i),
            Variant::UInt32(u) => SimValue::Int(i32::try_from(*u)?),
            Variant::Int64(i) => SimValue::Int(i32::try_from(*i)?),
            Variant::UInt64(u) => SimValue::Int(i32::try_from(*u)?),
            other => {
                return Err(format!("Unsupported value {:?} in node {}", other, node_id).into())
            }
        };
        Ok(value)
    }

    fn sim_value_to_variant(value: SimValue) -> Variant {
        match value {
            SimValue::Float(f) => Variant::Double(f),
            SimValue::Int(i) => Variant::Int32(i),
        }
    }
}

#[async_trait]
impl VariableStore for OpcUaStore {
    async fn read(&self, variable: SimulatedVariable) -> SimResult<SimValue> {
        let node_id = self.node_id(variable);
        let data_value = {
            let space = self.node_manager.address_space().read();
            match space.find_node(&node_id) {
                Some(NodeType::Variable(node)) => node.value(
                    TimestampsToReturn::Neither,
                    &NumericRange::None,
                    &DataEncoding::Binary,
                    0.0,
                ),
                Some(_) => return Err(format!("Node {} is not a variable", node_id).into()),
                None => return Err(format!("Node {} not found", node_id).into()),
            }
        };

        if let Some(status) = data_value.status {
            if !status.is_good() {
                return Err(format!("Bad status {:?} for node {}", status, node_id).into());
            }
        }
        let variant = data_value
            .value
            .ok_or_else(|| format!("Node {} has an empty value", node_id))?;
        Self::variant_to_sim_value(&node_id, &variant)
    }

    async fn write(&self, variable: SimulatedVariable, value: SimValue) -> SimResult<()> {
        let node_id = self.node_id(variable);
        let data_value = DataValue::new_now(Self::sim_value_to_variant(value));
        self.node_manager
            .set_values(
                &self.subscriptions,
                [(&node_id, None, data_value)].into_iter(),
            )
            .map_err(|status| format!("Write to {} failed: {:?}", node_id, status))?;
        Ok(())
    }
}
