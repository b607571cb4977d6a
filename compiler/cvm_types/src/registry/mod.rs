//! Struct declarations and type-name resolution.
//!
//! Structs are registered in two steps so members may refer to structs
//! declared later: [`TypeRegistry::declare`] hands out a [`StructId`] for a
//! name, [`TypeRegistry::define`] later fills in the members. A `CType`
//! only ever holds the id, which keeps self-referential structs
//! (`struct Node { Node* next; }`) acyclic.
//!
//! Defining a struct lays out its fields (cell offsets) and builds its
//! method index once, so overload resolution on `p.move(...)` is a map
//! lookup instead of a scan of every member.

use std::fmt;
use std::sync::Arc;

use cvm_ir::{Signature, TypeName};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{CType, FunctionType, MachineInfo, Parameter};

/// Handle to a struct in a [`TypeRegistry`]. Compares by declared name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructId {
    index: u32,
    name: Arc<str>,
}

impl StructId {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A resolved struct member.
#[derive(Clone, Debug, PartialEq)]
pub enum StructMember {
    Field { name: String, ty: CType },
    Method { name: String, ty: Arc<FunctionType> },
}

impl StructMember {
    pub fn name(&self) -> &str {
        match self {
            StructMember::Field { name, .. } | StructMember::Method { name, .. } => name,
        }
    }
}

/// A type name that cannot be resolved.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("The type '{0}' could not be found")]
    Unknown(String),
    #[error("'{0}' is used by value before its definition is complete")]
    Incomplete(String),
}

/// A declared struct.
#[derive(Clone, Debug)]
pub struct StructType {
    id: StructId,
    members: Vec<StructMember>,
    /// Cell offset of each member; 0 for methods.
    offsets: Vec<u32>,
    cell_count: u32,
    defined: bool,
    /// Method name → member indexes, in declaration order.
    methods: FxHashMap<String, SmallVec<[usize; 4]>>,
}

impl StructType {
    pub fn id(&self) -> &StructId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn members(&self) -> &[StructMember] {
        &self.members
    }

    /// Cells a value of this struct occupies.
    pub fn cell_count(&self) -> u32 {
        self.cell_count
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name() == name)
    }

    /// Offset and type of the field called `name`.
    pub fn field(&self, name: &str) -> Option<(u32, &CType)> {
        self.members
            .iter()
            .zip(&self.offsets)
            .find_map(|(member, offset)| match member {
                StructMember::Field { name: n, ty } if n == name => Some((*offset, ty)),
                _ => None,
            })
    }

    /// Overload candidates for `name`, in declaration order.
    pub fn methods_named(&self, name: &str) -> SmallVec<[&Arc<FunctionType>; 4]> {
        let Some(indexes) = self.methods.get(name) else {
            return SmallVec::new();
        };
        indexes
            .iter()
            .filter_map(|&i| match &self.members[i] {
                StructMember::Method { ty, .. } => Some(ty),
                StructMember::Field { .. } => None,
            })
            .collect()
    }
}

/// All structs of a compilation unit.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    structs: Vec<StructType>,
    by_name: FxHashMap<String, u32>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, declaring it on first use.
    pub fn declare(&mut self, name: &str) -> StructId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let index = u32::try_from(self.structs.len()).unwrap_or(u32::MAX);
        let id = StructId {
            index,
            name: Arc::from(name),
        };
        self.structs.push(StructType {
            id: id.clone(),
            members: Vec::new(),
            offsets: Vec::new(),
            cell_count: 0,
            defined: false,
            methods: FxHashMap::default(),
        });
        self.by_name.insert(name.to_owned(), index);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<StructId> {
        let index = *self.by_name.get(name)?;
        self.structs.get(index as usize).map(|s| s.id.clone())
    }

    pub fn get(&self, id: &StructId) -> Option<&StructType> {
        self.structs
            .get(id.index as usize)
            .filter(|s| s.id.name == id.name)
    }

    /// Give a declared struct its members, laying out fields and indexing
    /// methods.
    ///
    /// Fields of struct type must name structs that are already defined.
    pub fn define(&mut self, id: &StructId, members: Vec<StructMember>) -> Result<(), TypeError> {
        let mut offsets = Vec::with_capacity(members.len());
        let mut methods: FxHashMap<String, SmallVec<[usize; 4]>> = FxHashMap::default();
        let mut cell_count = 0u32;

        for (index, member) in members.iter().enumerate() {
            match member {
                StructMember::Field { ty, .. } => {
                    if let CType::Struct(inner) = ty {
                        if !self.get(inner).is_some_and(StructType::is_defined) {
                            return Err(TypeError::Incomplete(inner.name().to_owned()));
                        }
                    }
                    offsets.push(cell_count);
                    cell_count += self.cell_count(ty);
                }
                StructMember::Method { name, .. } => {
                    offsets.push(0);
                    methods.entry(name.clone()).or_default().push(index);
                }
            }
        }

        let Some(target) = self.structs.get_mut(id.index as usize) else {
            return Err(TypeError::Unknown(id.name().to_owned()));
        };
        tracing::debug!(
            name = %id,
            cells = cell_count,
            members = members.len(),
            "struct defined"
        );
        target.members = members;
        target.offsets = offsets;
        target.cell_count = cell_count;
        target.methods = methods;
        target.defined = true;
        Ok(())
    }

    /// Cells a value of `ty` occupies in memory.
    pub fn cell_count(&self, ty: &CType) -> u32 {
        match ty {
            CType::Void => 0,
            CType::Basic(_) | CType::Pointer(_) | CType::Function(_) => 1,
            CType::Struct(id) => self.get(id).map_or(0, StructType::cell_count),
        }
    }

    /// Resolve written type syntax against this registry and a machine.
    pub fn resolve(&self, name: &TypeName, machine: &MachineInfo) -> Result<CType, TypeError> {
        match name {
            TypeName::Void => Ok(CType::Void),
            TypeName::Basic { name, signedness } => Ok(CType::basic(*name, *signedness, machine)),
            TypeName::Pointer(inner) => Ok(self.resolve(inner, machine)?.pointer_to()),
            TypeName::Struct(name) => self
                .lookup(name)
                .map(CType::Struct)
                .ok_or_else(|| TypeError::Unknown(name.clone())),
            TypeName::Function {
                return_type,
                params,
            } => {
                let return_type = self.resolve(return_type, machine)?;
                let parameters = params
                    .iter()
                    .map(|p| Ok(Parameter::new(String::new(), self.resolve(p, machine)?)))
                    .collect::<Result<Vec<_>, TypeError>>()?;
                Ok(CType::function(FunctionType::new(return_type, parameters)))
            }
        }
    }

    /// Resolve a declared signature, converting defaults to their
    /// parameter's representation.
    pub fn resolve_signature(
        &self,
        signature: &Signature,
        machine: &MachineInfo,
    ) -> Result<FunctionType, TypeError> {
        let return_type = self.resolve(&signature.return_type, machine)?;
        let parameters = signature
            .params
            .iter()
            .map(|p| {
                let param = Parameter::new(p.name.clone(), self.resolve(&p.ty, machine)?);
                Ok(match p.default {
                    Some(value) => param.with_default(value),
                    None => param,
                })
            })
            .collect::<Result<Vec<_>, TypeError>>()?;
        Ok(FunctionType::new(return_type, parameters))
    }
}
