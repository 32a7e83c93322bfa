use std::collections::BTreeMap;

use tokio_modbus::ExceptionCode;

use crate::components::Component;
use crate::connection::{Error, Operation, RegisterIo};
use crate::registers::{ApiVersion, RegisterKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Read { kind: RegisterKind, address: u16, count: u16 },
    Write { address: u16, words: Vec<u16> },
}

/// A controller that keeps its registers in memory and remembers every request it served.
///
/// Addresses that were never mapped answer with an illegal data address exception, the same way
/// the controller does.
#[derive(Default, Debug)]
pub struct MemoryDevice {
    pub input: BTreeMap<u16, u16>,
    pub holding: BTreeMap<u16, u16>,
    pub requests: Vec<Request>,
    /// Answer reads with at most this many words.
    pub truncate_reads: Option<usize>,
}

impl MemoryDevice {
    /// Map every register `component` has on `version`, zero initialized.
    pub fn with_component(mut self, component: Component, version: ApiVersion) -> Self {
        for register in component.registers(version) {
            let Some(address) = component.address_of(register) else { continue };
            let map = self.map_mut(register.kind);
            for word in 0..register.data_type.words() as u16 {
                map.insert(address + word, 0);
            }
        }
        self
    }

    pub fn set(&mut self, kind: RegisterKind, address: u16, words: &[u16]) {
        let map = self.map_mut(kind);
        for (idx, word) in words.iter().enumerate() {
            map.insert(address + idx as u16, *word);
        }
    }

    fn map_mut(&mut self, kind: RegisterKind) -> &mut BTreeMap<u16, u16> {
        match kind {
            RegisterKind::Input => &mut self.input,
            RegisterKind::Holding => &mut self.holding,
        }
    }
}

impl RegisterIo for MemoryDevice {
    async fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, Error> {
        self.requests.push(Request::Read { kind, address, count });
        let op = Operation::read(kind);
        let map = self.map_mut(kind);
        let mut words = (address..address + count)
            .map(|a| map.get(&a).copied())
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::Exception { code: ExceptionCode::IllegalDataAddress, op, address })?;
        if let Some(limit) = self.truncate_reads {
            words.truncate(limit);
        }
        Ok(words)
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), Error> {
        self.requests.push(Request::Write { address, words: words.to_vec() });
        let op = if words.len() == 1 { Operation::WriteSingle } else { Operation::WriteMultiple };
        let mapped = (address..address + words.len() as u16).all(|a| self.holding.contains_key(&a));
        if !mapped {
            return Err(Error::Exception { code: ExceptionCode::IllegalDataAddress, op, address });
        }
        self.set(RegisterKind::Holding, address, words);
        Ok(())
    }
}
