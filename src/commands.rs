fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

pub mod registers {
    use crate::components::{Component, ComponentKind};
    use crate::output;
    use crate::registers::{ApiVersion, Mode, RegisterKind, Unit, Value};

    /// Search and output the known registers of all components.
    ///
    /// Addresses are those of the first instance of each component.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,

        /// Only list registers whose component, name, address or description contains this.
        filter: Option<String>,

        /// Only list registers available in this API version.
        #[arg(long)]
        api_version: Option<ApiVersion>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the register list")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct RegisterSchema {
        pub component: ComponentKind,
        pub kind: RegisterKind,
        pub address: Option<u16>,
        pub name: &'static str,
        pub mode: Mode,
        pub data_type: String,
        pub unit: Unit,
        pub minimum: Option<Value>,
        pub maximum: Option<Value>,
        pub since: ApiVersion,
        pub description: &'static str,
    }

    impl RegisterSchema {
        pub fn all_registers() -> impl Iterator<Item = Self> {
            <ComponentKind as strum::VariantArray>::VARIANTS.iter().flat_map(|&component| {
                let first = Component::new(component, 0);
                component.registers().iter().map(move |register| {
                    let bound = |raw: Option<i64>| raw.and_then(|r| register.data_type.value(r).ok());
                    RegisterSchema {
                        component,
                        kind: register.kind,
                        address: first.address_of(register),
                        name: register.name,
                        mode: register.mode,
                        data_type: register.data_type.to_string(),
                        unit: register.unit,
                        minimum: bound(register.minimum),
                        maximum: bound(register.maximum),
                        since: register.since,
                        description: register.description,
                    }
                })
            })
        }

        pub fn is_match(&self, pattern: &str) -> bool {
            let pattern = pattern.to_uppercase().replace('-', "_");
            self.name.contains(&pattern)
                || self.component.to_string().to_uppercase().replace('-', "_").contains(&pattern)
                || self.description.to_uppercase().contains(&pattern)
                || self.address.is_some_and(|a| a.to_string().contains(&pattern))
        }

        fn table_row(&self) -> Vec<String> {
            let optional = |v: Option<Value>| v.map(|v| v.to_string()).unwrap_or_default();
            let unit = match self.unit.states() {
                Some(states) => states.to_string(),
                None => self.unit.symbol().to_string(),
            };
            vec![
                self.component.to_string(),
                self.kind.to_string(),
                self.address.map(|a| a.to_string()).unwrap_or_default(),
                self.name.to_string(),
                self.mode.to_string(),
                self.data_type.clone(),
                unit,
                optional(self.minimum),
                optional(self.maximum),
                self.since.to_string(),
                self.description.to_string(),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output()?;
        output.table_headers(vec![
            "Component",
            "Kind",
            "Address",
            "Name",
            "Mode",
            "Type",
            "Unit",
            "Min",
            "Max",
            "Since",
            "Description",
        ])?;
        for register in RegisterSchema::all_registers() {
            if let Some(pattern) = &args.filter {
                if !register.is_match(pattern) {
                    continue;
                }
            }
            if let Some(version) = args.api_version {
                if register.since > version {
                    continue;
                }
            }
            output.result(|| register.table_row(), || &register)?;
        }
        output.commit()?;
        Ok(())
    }

}

pub mod read {
    use crate::components::{self, Component, Derived, Layout, Reading};
    use crate::connection::{self, Connection};
    use crate::output;
    use crate::system::{self, HeatingSystem};

    /// Read the current values of the system's components.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,

        #[clap(flatten)]
        layout: Layout,

        #[clap(flatten)]
        output: output::Args,

        /// Print a readable summary of each component instead of a table.
        #[arg(long)]
        summary: bool,

        /// Components to read, e.g. `heat-pump` or `heating-circuit-2`. All by default.
        components: Vec<Component>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not start the async runtime")]
        Runtime(#[source] std::io::Error),
        #[error("could not connect to the controller")]
        Connect(#[source] connection::Error),
        #[error("the system layout is not valid")]
        Layout(#[source] components::Error),
        #[error("reading from the controller failed")]
        Read(#[source] system::Error),
        #[error("could not output the values")]
        Output(#[from] output::Error),
        #[error("could not write data to the terminal")]
        WriteStdout(#[source] std::io::Error),
    }

    #[derive(serde::Serialize)]
    struct ReadingRecord {
        component: Component,
        name: &'static str,
        address: Option<u16>,
        value: crate::registers::Value,
        raw: i64,
        unit: crate::registers::Unit,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<&'static str>,
    }

    #[derive(serde::Serialize)]
    struct DerivedRecord {
        component: Component,
        name: &'static str,
        value: Option<f64>,
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let Args { connection, layout, output, summary, components } = args;
        let configured = layout.components().map_err(Error::Layout)?;
        if let Some(missing) = components.iter().find(|c| !configured.contains(c)) {
            return Err(Error::Layout(components::Error::NotConfigured(*missing)));
        }
        let snapshots = super::runtime().map_err(Error::Runtime)?.block_on(async {
            let connection = Connection::new(&connection).await.map_err(Error::Connect)?;
            let mut system = HeatingSystem::new(connection, layout).map_err(Error::Read)?;
            let result = if components.is_empty() {
                system.update().await
            } else {
                let mut snapshots = Vec::with_capacity(components.len());
                let mut result = Ok(());
                for component in components {
                    match system.read(component).await {
                        Ok(snapshot) => snapshots.push(snapshot),
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
                result.map(|()| snapshots)
            };
            system.close().await;
            result.map_err(Error::Read)
        })?;

        if summary {
            use std::io::Write as _;
            let mut stdout = std::io::stdout().lock();
            for snapshot in &snapshots {
                writeln!(stdout, "{snapshot}").map_err(Error::WriteStdout)?;
            }
            return Ok(());
        }

        let mut output = output.to_output()?;
        output.table_headers(vec!["Component", "Name", "Address", "Value", "Raw"])?;
        for snapshot in &snapshots {
            let component = snapshot.component;
            for &Reading { register, value } in &snapshot.readings {
                let address = component.address_of(register);
                output.result(
                    || {
                        vec![
                            component.to_string(),
                            register.name.to_string(),
                            address.map(|a| a.to_string()).unwrap_or_default(),
                            register.display_value(&value),
                            value.raw().to_string(),
                        ]
                    },
                    || ReadingRecord {
                        component,
                        name: register.name,
                        address,
                        value,
                        raw: value.raw(),
                        unit: register.unit,
                        state: register.unit.states().and_then(|s| s.label(value.raw())),
                    },
                )?;
            }
            for Derived { name, value } in snapshot.derived() {
                output.result(
                    || {
                        vec![
                            component.to_string(),
                            name.to_string(),
                            String::new(),
                            value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into()),
                            String::new(),
                        ]
                    },
                    || DerivedRecord { component, name, value },
                )?;
            }
        }
        output.commit()?;
        Ok(())
    }
}

pub mod write {
    use crate::components::{Component, Layout};
    use crate::connection::{self, Connection};
    use crate::system::{self, HeatingSystem};

    /// Write a value to a holding register and read it back.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,

        #[clap(flatten)]
        layout: Layout,

        /// The component to write to, e.g. `heating-circuit-1`.
        component: Component,

        /// The register name, e.g. `target-room-temperature`.
        register: String,

        /// The new value, in physical units or as a state label (e.g. `21.5`, `standby`).
        value: String,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not start the async runtime")]
        Runtime(#[source] std::io::Error),
        #[error("could not connect to the controller")]
        Connect(#[source] connection::Error),
        #[error("could not write {1} {2}")]
        Write(#[source] system::Error, Component, String),
        #[error("could not read {1} {2} back")]
        ReadBack(#[source] system::Error, Component, &'static str),
        #[error("could not write data to the terminal")]
        WriteStdout(#[source] std::io::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let Args { connection, layout, component, register, value } = args;
        let (spec, written, read_back) =
            super::runtime().map_err(Error::Runtime)?.block_on(async {
                let connection = Connection::new(&connection).await.map_err(Error::Connect)?;
                let write_error = |e| Error::Write(e, component, register.clone());
                let mut system = HeatingSystem::new(connection, layout).map_err(write_error)?;
                let result = async {
                    let spec = system.register(component, &register).map_err(write_error)?;
                    let written = system
                        .write_text(component, &register, &value)
                        .await
                        .map_err(write_error)?;
                    let read_back = system
                        .read_register(component, spec)
                        .await
                        .map_err(|e| Error::ReadBack(e, component, spec.name))?;
                    Ok::<_, Error>((spec, written, read_back))
                }
                .await;
                system.close().await;
                result
            })?;
        if read_back != written {
            tracing::warn!(
                message = "the controller did not keep the written value",
                written = %written,
                read_back = %read_back,
            );
        }
        use std::io::Write as _;
        writeln!(std::io::stdout(), "{component} {} = {}", spec.name, spec.display_value(&read_back))
            .map_err(Error::WriteStdout)
    }
}
