use std::fmt;
use std::ops::Index;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{AccessMode, AddressSpace, Module, Struct};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct Type(TypeInner);

impl Type {
    pub fn to_string(&self, module: &Module) -> String {
        module.ty()[*self].to_string(module)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
enum TypeInner {
    U32,
    I32,
    F32,
    Bool,
    AbstractInt,
    AbstractFloat,
    Void,
    Sampler,
    TextureExternal,
    Registered(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Vector {
        scalar: ScalarKind,
        size: VectorSize,
    },
    Array {
        base: Type,
        /// `None` for runtime-sized arrays (the tail of a storage buffer).
        count: Option<u64>,
    },
    Struct(Struct),
    Reference {
        space: AddressSpace,
        base: Type,
        access: AccessMode,
    },
    Sampler,
    TextureExternal,
    Void,
}

impl TypeKind {
    pub fn is_struct(&self) -> bool {
        matches!(self, TypeKind::Struct(_))
    }

    pub fn expect_struct(&self) -> Struct {
        if let TypeKind::Struct(struct_handle) = self {
            *struct_handle
        } else {
            panic!("not a struct type");
        }
    }

    pub fn expect_reference(&self) -> (AddressSpace, Type, AccessMode) {
        if let TypeKind::Reference {
            space,
            base,
            access,
        } = self
        {
            (*space, *base, *access)
        } else {
            panic!("not a reference type");
        }
    }

    fn to_string(&self, module: &Module) -> String {
        match self {
            TypeKind::Scalar(scalar) => format!("{}", scalar),
            TypeKind::Vector { scalar, size } => {
                format!("vec{}<{}>", size.to_u32(), scalar)
            }
            TypeKind::Array {
                base,
                count: Some(count),
            } => format!("array<{}, {}>", base.to_string(module), count),
            TypeKind::Array { base, count: None } => {
                format!("array<{}>", base.to_string(module))
            }
            TypeKind::Struct(struct_handle) => module.structs[*struct_handle].name.to_string(),
            TypeKind::Reference { base, .. } => format!("ref<{}>", base.to_string(module)),
            TypeKind::Sampler => "sampler".to_string(),
            TypeKind::TextureExternal => "texture_external".to_string(),
            TypeKind::Void => "void".to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum ScalarKind {
    U32,
    I32,
    F32,
    Bool,
    AbstractInt,
    AbstractFloat,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::U32 => write!(f, "u32"),
            ScalarKind::I32 => write!(f, "i32"),
            ScalarKind::F32 => write!(f, "f32"),
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::AbstractInt => write!(f, "{{integer}}"),
            ScalarKind::AbstractFloat => write!(f, "{{float}}"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum VectorSize {
    Two,
    Three,
    Four,
}

impl VectorSize {
    pub fn to_u32(&self) -> u32 {
        match self {
            VectorSize::Two => 2,
            VectorSize::Three => 3,
            VectorSize::Four => 4,
        }
    }
}

pub const TY_KIND_U32: TypeKind = TypeKind::Scalar(ScalarKind::U32);
pub const TY_KIND_I32: TypeKind = TypeKind::Scalar(ScalarKind::I32);
pub const TY_KIND_F32: TypeKind = TypeKind::Scalar(ScalarKind::F32);
pub const TY_KIND_BOOL: TypeKind = TypeKind::Scalar(ScalarKind::Bool);
pub const TY_KIND_ABSTRACT_INT: TypeKind = TypeKind::Scalar(ScalarKind::AbstractInt);
pub const TY_KIND_ABSTRACT_FLOAT: TypeKind = TypeKind::Scalar(ScalarKind::AbstractFloat);
pub const TY_KIND_VOID: TypeKind = TypeKind::Void;
pub const TY_KIND_SAMPLER: TypeKind = TypeKind::Sampler;
pub const TY_KIND_TEXTURE_EXTERNAL: TypeKind = TypeKind::TextureExternal;

pub const TY_U32: Type = Type(TypeInner::U32);
pub const TY_I32: Type = Type(TypeInner::I32);
pub const TY_F32: Type = Type(TypeInner::F32);
pub const TY_BOOL: Type = Type(TypeInner::Bool);
pub const TY_ABSTRACT_INT: Type = Type(TypeInner::AbstractInt);
pub const TY_ABSTRACT_FLOAT: Type = Type(TypeInner::AbstractFloat);
pub const TY_VOID: Type = Type(TypeInner::Void);
pub const TY_SAMPLER: Type = Type(TypeInner::Sampler);
pub const TY_TEXTURE_EXTERNAL: Type = Type(TypeInner::TextureExternal);

#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct TypeRegistry {
    store: IndexSet<TypeKind>,
}

impl TypeRegistry {
    pub fn register(&mut self, ty_kind: TypeKind) -> Type {
        match &ty_kind {
            TypeKind::Scalar(ScalarKind::U32) => return TY_U32,
            TypeKind::Scalar(ScalarKind::I32) => return TY_I32,
            TypeKind::Scalar(ScalarKind::F32) => return TY_F32,
            TypeKind::Scalar(ScalarKind::Bool) => return TY_BOOL,
            TypeKind::Scalar(ScalarKind::AbstractInt) => return TY_ABSTRACT_INT,
            TypeKind::Scalar(ScalarKind::AbstractFloat) => return TY_ABSTRACT_FLOAT,
            TypeKind::Void => return TY_VOID,
            TypeKind::Sampler => return TY_SAMPLER,
            TypeKind::TextureExternal => return TY_TEXTURE_EXTERNAL,
            _ => (),
        }

        let index = self.store.insert_full(ty_kind).0;

        Type(TypeInner::Registered(index))
    }
}

impl Index<Type> for TypeRegistry {
    type Output = TypeKind;

    fn index(&self, ty: Type) -> &Self::Output {
        match ty.0 {
            TypeInner::U32 => &TY_KIND_U32,
            TypeInner::I32 => &TY_KIND_I32,
            TypeInner::F32 => &TY_KIND_F32,
            TypeInner::Bool => &TY_KIND_BOOL,
            TypeInner::AbstractInt => &TY_KIND_ABSTRACT_INT,
            TypeInner::AbstractFloat => &TY_KIND_ABSTRACT_FLOAT,
            TypeInner::Void => &TY_KIND_VOID,
            TypeInner::Sampler => &TY_KIND_SAMPLER,
            TypeInner::TextureExternal => &TY_KIND_TEXTURE_EXTERNAL,
            TypeInner::Registered(index) => self.store.get_index(index).expect("unregistered type"),
        }
    }
}
