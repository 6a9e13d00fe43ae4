//! Session file format for saving/loading signal chains.
//!
//! Uses RON (Rust Object Notation) for human-readable, version-control-friendly
//! serialization of the units in a chain, their properties, and the
//! connections between their ports.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use sigchain_core::{AudioConfig, PortAddress, PropertyMap, UnitId};
use sigchain_unit::UnitError;

use crate::chain::SignalChain;
use crate::factory::UnitFactory;

/// Current session format version
pub const SESSION_VERSION: u32 = 1;

/// A unit in the session (serializable version of `AudioUnit`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUnit {
    /// Unique unit ID within this session
    pub id: usize,

    /// Factory uid used to re-create the unit
    pub uid: String,

    /// Settings written by the unit's `serialize` hook
    #[serde(default)]
    pub properties: PropertyMap,
}

/// One end of a connection: session unit ID plus port index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionPort {
    pub unit: usize,
    pub index: usize,
}

/// Connection from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionConnection {
    /// Output port being read
    pub from: SessionPort,

    /// Input port reading it
    pub to: SessionPort,
}

/// The complete chain structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionChain {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// All units, in chain order
    pub units: Vec<SessionUnit>,

    /// Connections between unit ports
    pub connections: Vec<SessionConnection>,
}

const fn default_enabled() -> bool {
    true
}

/// Top-level session structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Format version for future compatibility
    pub version: u32,

    /// Human-readable session name
    pub name: String,

    /// Sample rate and block size handed to units on start
    pub config: AudioConfig,

    /// The signal chain
    pub chain: SessionChain,
}

/// Two-way mapping between live unit ids and session unit ids.
///
/// Live ids depend on the order units were added to (and removed from) a
/// chain; session ids are dense and stable within a file.
#[derive(Debug, Clone, Default)]
pub struct SerializationContext {
    session_ids: HashMap<UnitId, usize>,
    unit_ids: HashMap<usize, UnitId>,
}

impl SerializationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `unit` is stored as `session_id`
    pub fn insert(&mut self, unit: UnitId, session_id: usize) {
        self.session_ids.insert(unit, session_id);
        self.unit_ids.insert(session_id, unit);
    }

    pub fn session_id(&self, unit: UnitId) -> Option<usize> {
        self.session_ids.get(&unit).copied()
    }

    pub fn unit_id(&self, session_id: usize) -> Option<UnitId> {
        self.unit_ids.get(&session_id).copied()
    }

    pub fn contains_session_id(&self, session_id: usize) -> bool {
        self.unit_ids.contains_key(&session_id)
    }

    pub fn len(&self) -> usize {
        self.session_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session_ids.is_empty()
    }
}

impl Session {
    /// Create a new empty session
    #[must_use]
    pub fn new(name: impl Into<String>, config: AudioConfig) -> Self {
        Self {
            version: SESSION_VERSION,
            name: name.into(),
            config,
            chain: SessionChain {
                enabled: true,
                units: Vec::new(),
                connections: Vec::new(),
            },
        }
    }

    /// Save session to a RON file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be written or serialization fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SessionError::SerializationFailed(e.to_string()))?;

        std::fs::write(path.as_ref(), ron_string)
            .map_err(|e| SessionError::IoError(e.to_string()))?;

        tracing::info!("Saved session '{}' to {}", self.name, path.as_ref().display());
        Ok(())
    }

    /// Load session from a RON file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, deserialization fails, or the
    /// file was written by a newer format version
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let ron_string = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SessionError::IoError(e.to_string()))?;

        let session: Self = ron::from_str(&ron_string)
            .map_err(|e| SessionError::DeserializationFailed(e.to_string()))?;

        if session.version > SESSION_VERSION {
            return Err(SessionError::UnsupportedVersion(session.version));
        }

        tracing::info!(
            "Loaded session '{}' ({} units, {} connections)",
            session.name,
            session.chain.units.len(),
            session.chain.connections.len()
        );
        Ok(session)
    }

    /// Capture the units, properties, and connections of a chain
    ///
    /// # Errors
    ///
    /// Returns error if a connection refers to a unit outside the chain
    pub fn from_chain(chain: &SignalChain, name: impl Into<String>) -> Result<Self, SessionError> {
        let mut context = SerializationContext::new();
        let mut units = Vec::with_capacity(chain.len());

        for (session_id, unit) in chain.units().enumerate() {
            let Some(id) = unit.id() else {
                continue;
            };
            context.insert(id, session_id);

            let mut properties = PropertyMap::new();
            unit.serialize(&mut properties);

            units.push(SessionUnit {
                id: session_id,
                uid: unit.uid().to_string(),
                properties,
            });
        }

        let connections = chain
            .connections()
            .into_iter()
            .map(|(from, to)| {
                Ok(SessionConnection {
                    from: session_port(&context, from)?,
                    to: session_port(&context, to)?,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?;

        Ok(Self {
            version: SESSION_VERSION,
            name: name.into(),
            config: *chain.config(),
            chain: SessionChain {
                enabled: chain.is_enabled(),
                units,
                connections,
            },
        })
    }

    /// Reconstruct a signal chain from this session.
    ///
    /// Units are created through `factory` and restored with their
    /// `deserialize` hook. The returned chain is stopped.
    ///
    /// # Errors
    ///
    /// Returns error if a uid is unknown to the factory, a unit rejects its
    /// properties, session ids are duplicated, or a connection is invalid
    pub fn to_chain(&self, factory: &dyn UnitFactory) -> Result<SignalChain, SessionError> {
        let mut chain = SignalChain::with_config(self.config);
        chain.set_enabled(self.chain.enabled);
        let mut context = SerializationContext::new();

        for session_unit in &self.chain.units {
            if context.contains_session_id(session_unit.id) {
                return Err(SessionError::InvalidData(format!(
                    "Duplicate unit id {}",
                    session_unit.id
                )));
            }

            let mut unit = factory
                .create(&session_unit.uid)
                .ok_or_else(|| SessionError::UnknownUnit(session_unit.uid.clone()))?;

            unit.deserialize(&session_unit.properties)
                .map_err(|source| SessionError::Properties {
                    uid: session_unit.uid.clone(),
                    source,
                })?;

            let id = chain.add_audio_unit(unit);
            context.insert(id, session_unit.id);
        }

        for connection in &self.chain.connections {
            let from = PortAddress::output(
                chain_unit(&context, connection.from.unit)?,
                connection.from.index,
            );
            let to = PortAddress::input(
                chain_unit(&context, connection.to.unit)?,
                connection.to.index,
            );

            chain.connect(from, to)?;
        }

        tracing::debug!("Rebuilt chain from session '{}'", self.name);
        Ok(chain)
    }
}

fn session_port(
    context: &SerializationContext,
    address: PortAddress,
) -> Result<SessionPort, SessionError> {
    let unit = context.session_id(address.unit).ok_or_else(|| {
        SessionError::InvalidData(format!("Connection refers to unknown unit {}", address.unit))
    })?;

    Ok(SessionPort {
        unit,
        index: address.index,
    })
}

fn chain_unit(context: &SerializationContext, session_id: usize) -> Result<UnitId, SessionError> {
    context.unit_id(session_id).ok_or_else(|| {
        SessionError::InvalidData(format!("Connection refers to unknown unit {session_id}"))
    })
}

/// Errors that can occur during session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported session version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid session data: {0}")]
    InvalidData(String),

    #[error("No factory can create unit '{0}'")]
    UnknownUnit(String),

    #[error("Unit '{uid}' rejected its properties: {source}")]
    Properties {
        uid: String,
        #[source]
        source: UnitError,
    },

    #[error("Failed to restore connection: {0}")]
    Connection(#[from] sigchain_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{BuiltinFactory, constant::ConstantProcessor, mixer::MixerProcessor};
    use crate::unit::AudioUnit;
    use sigchain_core::Value;

    fn build_chain() -> (SignalChain, UnitId) {
        let mut chain = SignalChain::new();
        let source = chain.add_audio_unit(AudioUnit::new(Box::new(ConstantProcessor::new(2.0))));
        let gain = chain.add_audio_unit(AudioUnit::new(Box::new(ConstantProcessor::new(3.0))));
        let amp = chain
            .add_audio_unit(BuiltinFactory.create("sigchain.builtin.amplifier").unwrap());

        let mut mixer = MixerProcessor::default();
        mixer.set_gains(0.5, 1.0, 1.0);
        let mix = chain.add_audio_unit(AudioUnit::new(Box::new(mixer)));

        chain
            .connect(PortAddress::output(source, 0), PortAddress::input(amp, 0))
            .unwrap();
        chain
            .connect(PortAddress::output(gain, 0), PortAddress::input(amp, 1))
            .unwrap();
        chain
            .connect(PortAddress::output(amp, 0), PortAddress::input(mix, 0))
            .unwrap();
        (chain, mix)
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new("Test Session", AudioConfig::default());
        assert_eq!(session.version, SESSION_VERSION);
        assert_eq!(session.name, "Test Session");
        assert!(session.chain.enabled);
        assert!(session.chain.units.is_empty());
        assert!(session.chain.connections.is_empty());
    }

    #[test]
    fn test_from_chain_captures_units_and_connections() {
        let (chain, _) = build_chain();
        let session = Session::from_chain(&chain, "capture").unwrap();

        assert_eq!(session.chain.units.len(), 4);
        assert_eq!(session.chain.units[0].uid, "sigchain.builtin.constant");
        assert_eq!(
            session.chain.units[1].properties.get("value"),
            Some(&Value::Double(3.0))
        );
        assert_eq!(session.chain.connections.len(), 3);
        assert!(session.chain.connections.contains(&SessionConnection {
            from: SessionPort { unit: 1, index: 0 },
            to: SessionPort { unit: 2, index: 1 },
        }));
    }

    #[test]
    fn test_session_ids_are_dense_after_removal() {
        let (mut chain, _) = build_chain();
        chain.remove_audio_unit(UnitId(0));

        let session = Session::from_chain(&chain, "dense").unwrap();
        let ids: Vec<usize> = session.chain.units.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        // The amplifier input that read the removed unit is gone
        assert_eq!(session.chain.connections.len(), 2);
    }

    #[test]
    fn test_save_load_rebuild() {
        let (mut chain, mix) = build_chain();
        chain.set_enabled(false);
        let session = Session::from_chain(&chain, "round trip").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.ron");
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, session);

        let mut rebuilt = loaded.to_chain(&BuiltinFactory).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert!(!rebuilt.is_enabled());
        assert_eq!(rebuilt.connections(), chain.connections());

        rebuilt.set_enabled(true);
        rebuilt.start().unwrap();
        rebuilt.run_cycle(&[mix]);
        // (2.0 * 3.0) * gain1 0.5
        assert_eq!(rebuilt.output_value(mix, 0).unwrap(), Value::Double(3.0));
    }

    #[test]
    fn test_unknown_uid() {
        let mut session = Session::new("unknown", AudioConfig::default());
        session.chain.units.push(SessionUnit {
            id: 0,
            uid: "vendor.reverb".to_string(),
            properties: PropertyMap::new(),
        });

        assert!(matches!(
            session.to_chain(&BuiltinFactory),
            Err(SessionError::UnknownUnit(uid)) if uid == "vendor.reverb"
        ));
    }

    #[test]
    fn test_rejected_properties() {
        let mut session = Session::new("bad props", AudioConfig::default());
        let mut properties = PropertyMap::new();
        properties.insert("value".to_string(), Value::from("two"));
        session.chain.units.push(SessionUnit {
            id: 0,
            uid: "sigchain.builtin.constant".to_string(),
            properties,
        });

        assert!(matches!(
            session.to_chain(&BuiltinFactory),
            Err(SessionError::Properties { .. })
        ));
    }

    #[test]
    fn test_invalid_connections() {
        let mut session = Session::new("bad wiring", AudioConfig::default());
        for id in [0, 1] {
            session.chain.units.push(SessionUnit {
                id,
                uid: "sigchain.builtin.constant".to_string(),
                properties: PropertyMap::new(),
            });
        }

        // Constant has no inputs
        session.chain.connections.push(SessionConnection {
            from: SessionPort { unit: 0, index: 0 },
            to: SessionPort { unit: 1, index: 0 },
        });
        assert!(matches!(
            session.to_chain(&BuiltinFactory),
            Err(SessionError::Connection(sigchain_core::Error::PortOutOfRange { .. }))
        ));

        session.chain.connections[0].to.unit = 9;
        assert!(matches!(
            session.to_chain(&BuiltinFactory),
            Err(SessionError::InvalidData(_))
        ));
    }

    #[test]
    fn test_duplicate_session_ids() {
        let mut session = Session::new("dupes", AudioConfig::default());
        for _ in 0..2 {
            session.chain.units.push(SessionUnit {
                id: 3,
                uid: "sigchain.builtin.constant".to_string(),
                properties: PropertyMap::new(),
            });
        }

        assert!(matches!(
            session.to_chain(&BuiltinFactory),
            Err(SessionError::InvalidData(_))
        ));
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let mut session = Session::new("future", AudioConfig::default());
        session.version = SESSION_VERSION + 1;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.ron");
        session.save(&path).unwrap();

        assert!(matches!(
            Session::load(&path),
            Err(SessionError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Session::load(dir.path().join("missing.ron")),
            Err(SessionError::IoError(_))
        ));
    }
}
