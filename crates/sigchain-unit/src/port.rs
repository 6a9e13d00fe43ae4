//! Typed ports owned by an audio unit.
//!
//! Ports never own each other. An input refers to the output it reads from
//! by address (owning unit id plus port index), and the owning signal chain
//! resolves that address when the input is read.

use sigchain_core::{Direction, Error, PortAddress, Result, UnitId, Value, ValueType};

use crate::PortSpec;

/// Port that stores the value its unit produced this cycle
#[derive(Debug, Clone)]
pub struct OutputPort {
    name: String,
    value_type: ValueType,
    index: usize,
    owner: Option<UnitId>,
    value: Value,
}

impl OutputPort {
    pub fn new(name: impl Into<String>, value_type: ValueType, index: usize) -> Self {
        Self {
            name: name.into(),
            value_type,
            index,
            owner: None,
            value: value_type.default_value(),
        }
    }

    pub fn from_spec(spec: &PortSpec, index: usize) -> Self {
        Self::new(spec.name.clone(), spec.value_type, index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn direction(&self) -> Direction {
        Direction::Output
    }

    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Position within the owning unit's output list
    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn owner(&self) -> Option<UnitId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<UnitId>) {
        self.owner = owner;
    }

    /// Address of this port, once its unit belongs to a chain
    pub fn address(&self) -> Option<PortAddress> {
        self.owner.map(|unit| PortAddress::output(unit, self.index))
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Store a new value, refusing values of another type
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        if value.value_type() != self.value_type {
            return Err(Error::TypeMismatch {
                expected: self.value_type,
                found: value.value_type(),
            });
        }
        self.value = value;
        Ok(())
    }
}

/// Port that reads the value of at most one connected output
#[derive(Debug, Clone)]
pub struct InputPort {
    name: String,
    value_type: ValueType,
    index: usize,
    owner: Option<UnitId>,
    connection: Option<PortAddress>,
}

impl InputPort {
    pub fn new(name: impl Into<String>, value_type: ValueType, index: usize) -> Self {
        Self {
            name: name.into(),
            value_type,
            index,
            owner: None,
            connection: None,
        }
    }

    pub fn from_spec(spec: &PortSpec, index: usize) -> Self {
        Self::new(spec.name.clone(), spec.value_type, index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn direction(&self) -> Direction {
        Direction::Input
    }

    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Position within the owning unit's input list
    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn owner(&self) -> Option<UnitId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<UnitId>) {
        self.owner = owner;
    }

    pub fn address(&self) -> Option<PortAddress> {
        self.owner.map(|unit| PortAddress::input(unit, self.index))
    }

    /// Address of the output this input reads from
    pub const fn connected_output(&self) -> Option<PortAddress> {
        self.connection
    }

    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Bind this input to `output`, replacing any previous binding.
    ///
    /// Fails without touching the current binding if the types differ or
    /// the output does not belong to a chain yet.
    pub fn connect(&mut self, output: &OutputPort) -> Result<()> {
        if output.value_type() != self.value_type {
            return Err(Error::TypeMismatch {
                expected: self.value_type,
                found: output.value_type(),
            });
        }

        let address = output
            .address()
            .ok_or_else(|| Error::Other(format!("output '{}' is not attached", output.name())))?;

        self.connection = Some(address);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Value read while unconnected
    pub fn default_value(&self) -> Value {
        self.value_type.default_value()
    }
}
