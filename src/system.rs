use tracing::{debug, info};

use crate::components::{self, Component, Layout, Reading, Snapshot};
use crate::connection::{self, Connection, RegisterIo};
use crate::properties::{Property, PropertyType};
use crate::registers::{
    ApiVersion, DecodeError, EncodeError, ParseValueError, RegisterKind, RegisterSpec, Value,
    WriteCheckError,
};
use crate::slices::{plan_reads, span_end};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("the system layout is not valid")]
    Layout(#[from] components::Error),
    #[error("communicating with {1} failed")]
    Connection(#[source] connection::Error, Component),
    #[error("could not decode {1} {2}")]
    Decode(#[source] DecodeError, Component, &'static str),
    #[error("{component} has no register named `{name}`")]
    UnknownRegister { component: Component, name: String },
    #[error("{component} {name} requires API version {since} or newer, the controller runs {version}")]
    Unavailable { component: Component, name: &'static str, since: ApiVersion, version: ApiVersion },
    #[error("{register} is not a register of {component}")]
    WrongComponent { component: Component, register: &'static str },
    #[error("{1} does not have {0} registers")]
    NotAddressable(RegisterKind, Component),
    #[error("refusing to write {1}")]
    WriteCheck(#[source] WriteCheckError, Component),
    #[error("could not parse the value for {1}")]
    ParseValue(#[source] ParseValueError, &'static str),
    #[error("could not encode the value for {1}")]
    Encode(#[source] EncodeError, &'static str),
}

/// The heating controller with the components installed in a particular system.
pub struct HeatingSystem<Io> {
    io: Io,
    layout: Layout,
    components: Vec<Component>,
}

impl<Io: RegisterIo> HeatingSystem<Io> {
    pub fn new(io: Io, layout: Layout) -> Result<Self, Error> {
        let components = layout.components()?;
        debug!(message = "system layout", components = ?components, api_version = %layout.api_version);
        Ok(Self { io, layout, components })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn io(&self) -> &Io {
        &self.io
    }

    fn check_configured(&self, component: Component) -> Result<(), Error> {
        if self.components.contains(&component) {
            Ok(())
        } else {
            Err(components::Error::NotConfigured(component).into())
        }
    }

    /// Look up a register of `component` that the controller firmware provides.
    pub fn register(&self, component: Component, name: &str) -> Result<&'static RegisterSpec, Error> {
        let register = component
            .kind
            .register(name)
            .ok_or_else(|| Error::UnknownRegister { component, name: name.to_string() })?;
        self.check_available(component, register)?;
        Ok(register)
    }

    fn check_available(&self, component: Component, register: &RegisterSpec) -> Result<(), Error> {
        let version = self.layout.api_version;
        if register.is_available(version) {
            Ok(())
        } else {
            Err(Error::Unavailable { component, name: register.name, since: register.since, version })
        }
    }

    /// Registers are only valid on the kind of component whose table they come from.
    fn check_register(&self, component: Component, register: &'static RegisterSpec) -> Result<(), Error> {
        self.check_configured(component)?;
        if !component.kind.registers().iter().any(|r| std::ptr::eq(r, register)) {
            return Err(Error::WrongComponent { component, register: register.name });
        }
        self.check_available(component, register)
    }

    fn property_register<T>(
        &self,
        component: Component,
        property: Property<T>,
    ) -> Result<&'static RegisterSpec, Error> {
        if property.component() != component.kind {
            return Err(Error::WrongComponent { component, register: property.name() });
        }
        self.register(component, property.name())
    }

    /// Read every register of `component` the controller provides.
    ///
    /// Neighbouring registers are fetched with a single request. Registers the controller does
    /// not map are never requested.
    pub async fn read(&mut self, component: Component) -> Result<Snapshot, Error> {
        self.check_configured(component)?;
        let version = self.layout.api_version;
        let mut readings = Vec::new();
        for kind in [RegisterKind::Input, RegisterKind::Holding] {
            let registers = component.registers(version).filter(|r| r.kind == kind).collect::<Vec<_>>();
            if registers.is_empty() {
                continue;
            }
            let base = component.base(kind).ok_or(Error::NotAddressable(kind, component))?;
            let spans = registers.iter().map(|r| (r.offset, r.data_type.words() as u16));
            let mut buffer = vec![0u16; span_end(spans.clone())];
            for slice in plan_reads(spans) {
                let address = base + slice.offset;
                debug!(message = "reading", %component, %kind, address, count = slice.count);
                let words = self
                    .io
                    .read_registers(kind, address, slice.count)
                    .await
                    .map_err(|e| Error::Connection(e, component))?;
                let target = &mut buffer[usize::from(slice.offset)..usize::from(slice.end())];
                if words.len() != target.len() {
                    let error = connection::Error::ShortResponse {
                        op: connection::Operation::read(kind),
                        address,
                        expected: slice.count,
                        got: words.len(),
                    };
                    return Err(Error::Connection(error, component));
                }
                target.copy_from_slice(&words);
            }
            for register in registers {
                let words = &buffer[usize::from(register.offset)..usize::from(register.end_offset())];
                let value = register
                    .data_type
                    .decode(words)
                    .map_err(|e| Error::Decode(e, component, register.name))?;
                readings.push(Reading { register, value });
            }
        }
        Ok(Snapshot { component, readings })
    }

    /// Read all components of the system, in layout order.
    pub async fn update(&mut self) -> Result<Vec<Snapshot>, Error> {
        let mut snapshots = Vec::with_capacity(self.components.len());
        for component in self.components.clone() {
            snapshots.push(self.read(component).await?);
        }
        Ok(snapshots)
    }

    /// Read a single register.
    pub async fn read_register(
        &mut self,
        component: Component,
        register: &'static RegisterSpec,
    ) -> Result<Value, Error> {
        self.check_register(component, register)?;
        let address = component
            .address_of(register)
            .ok_or(Error::NotAddressable(register.kind, component))?;
        let count = register.data_type.words() as u16;
        let words = self
            .io
            .read_registers(register.kind, address, count)
            .await
            .map_err(|e| Error::Connection(e, component))?;
        register.data_type.decode(&words).map_err(|e| Error::Decode(e, component, register.name))
    }

    /// Write `value` to a holding register after checking it is writable and within bounds.
    pub async fn write(
        &mut self,
        component: Component,
        register: &'static RegisterSpec,
        value: Value,
    ) -> Result<(), Error> {
        self.check_register(component, register)?;
        register.check_write(&value).map_err(|e| Error::WriteCheck(e, component))?;
        let address = component
            .address_of(register)
            .ok_or(Error::NotAddressable(register.kind, component))?;
        info!(message = "writing", %component, register = register.name, %value, address);
        self.io
            .write_registers(address, &value.to_words())
            .await
            .map_err(|e| Error::Connection(e, component))
    }

    /// Parse `text` for the named register and write it.
    pub async fn write_text(
        &mut self,
        component: Component,
        name: &str,
        text: &str,
    ) -> Result<Value, Error> {
        let register = self.register(component, name)?;
        let value = register.parse_value(text).map_err(|e| Error::ParseValue(e, register.name))?;
        self.write(component, register, value).await?;
        Ok(value)
    }

    pub async fn get<T: PropertyType>(
        &mut self,
        component: Component,
        property: Property<T>,
    ) -> Result<T, Error> {
        let register = self.property_register(component, property)?;
        let value = self.read_register(component, register).await?;
        T::decode(value).map_err(|e| Error::Decode(e, component, register.name))
    }

    pub async fn set<T: PropertyType>(
        &mut self,
        component: Component,
        property: Property<T>,
        value: T,
    ) -> Result<(), Error> {
        let register = self.property_register(component, property)?;
        let value = value.encode(register.data_type).map_err(|e| Error::Encode(e, register.name))?;
        self.write(component, register, value).await
    }
}

impl HeatingSystem<Connection> {
    pub async fn close(self) {
        self.io.close().await
    }
}
