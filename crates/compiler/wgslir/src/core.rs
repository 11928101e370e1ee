use std::ops::{Index, IndexMut};

use internment::Intern;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::ast::{Ast, Variable};
use crate::ty::{Type, TypeRegistry};

slotmap::new_key_type! {
    pub struct Struct;
}

pub type Symbol = Intern<String>;

pub fn sym(name: &str) -> Symbol {
    Intern::new(name.to_string())
}

/// `@group(n)` / `@binding(n)` coordinates of a resource-backed global.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct ResourceBinding {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum Attribute {
    Group(u32),
    Binding(u32),
}

pub type AttributeList = SmallVec<[Attribute; 2]>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum VariableFlavor {
    Var,
    Let,
    Const,
    Override,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    Handle,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum ShaderStage {
    Compute,
    Vertex,
    Fragment,
}

/// Tracks what a structure declaration is used for, so later stages can emit
/// the host-visible layout variant separately from the plain computation
/// variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum StructureRole {
    UserDefined,
    /// A user-defined structure that backs at least one resource binding.
    UserDefinedResource,
    /// The synthesized host-layout clone of a `UserDefinedResource` structure.
    PackedResource,
    /// A synthesized per-group argument-buffer structure.
    BindGroup,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct StructData {
    pub name: Symbol,
    pub members: Vec<StructMember>,
    pub role: StructureRole,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct StructMember {
    pub name: Symbol,
    pub ty: Type,
    pub attributes: AttributeList,
}

#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct StructRegistry {
    store: SlotMap<Struct, StructData>,
    order: Vec<Struct>,
}

impl StructRegistry {
    pub fn register(&mut self, struct_data: StructData) -> Struct {
        let struct_handle = self.store.insert(struct_data);

        self.order.push(struct_handle);

        struct_handle
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Struct> + use<'_> {
        self.order.iter().copied()
    }
}

impl Index<Struct> for StructRegistry {
    type Output = StructData;

    fn index(&self, struct_handle: Struct) -> &Self::Output {
        self.store.get(struct_handle).expect("unregistered struct")
    }
}

impl IndexMut<Struct> for StructRegistry {
    fn index_mut(&mut self, struct_handle: Struct) -> &mut Self::Output {
        self.store
            .get_mut(struct_handle)
            .expect("unregistered struct")
    }
}

/// A parsed, type-checked shader module.
///
/// Function bodies, expressions, and local/module-scope variable declarations
/// live in the [`Ast`] arenas; structure declarations and module-scope
/// declaration order are tracked here.
#[derive(Clone, Serialize, Debug)]
pub struct Module {
    pub name: Symbol,
    pub structs: StructRegistry,
    pub ast: Ast,
    /// Module-scope variable declarations, in declaration order.
    pub globals: Vec<Variable>,
    uses_external_textures: bool,
}

impl Module {
    pub fn new(name: Symbol) -> Self {
        Module {
            name,
            structs: Default::default(),
            ast: Ast::new(),
            globals: Vec::new(),
            uses_external_textures: false,
        }
    }

    pub fn ty(&self) -> &TypeRegistry {
        self.ast.ty()
    }

    pub fn uses_external_textures(&self) -> bool {
        self.uses_external_textures
    }

    pub fn set_uses_external_textures(&mut self) {
        self.uses_external_textures = true;
    }
}
