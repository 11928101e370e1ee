use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::call_graph::CallGraph;
use crate::{Module, ShaderStage, Symbol};

bitflags! {
    /// Shader-stage visibility mask for a bind-group-layout entry.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Debug)]
    pub struct ShaderStages: u32 {
        const COMPUTE = 1 << 0;
        const VERTEX = 1 << 1;
        const FRAGMENT = 1 << 2;
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Compute => ShaderStages::COMPUTE,
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Fragment => ShaderStages::FRAGMENT,
        }
    }
}

/// Host-side description of the resource bound at one binding slot.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum BindingMember {
    Buffer,
    Texture,
    Sampler,
    ExternalTexture,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    // TODO: populate the binding member from the bound global's store type.
    pub binding_member: Option<BindingMember>,
}

#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Debug)]
pub struct BindGroupLayout {
    pub entries: Vec<BindGroupLayoutEntry>,
}

/// The default pipeline layout derived for one entry point: bind group
/// layouts indexed by group number, grown on demand. A group index that was
/// never used may still exist as an empty intermediate layout.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Debug)]
pub struct PipelineLayout {
    pub bind_group_layouts: Vec<BindGroupLayout>,
}

impl PipelineLayout {
    /// Records `binding` in group `group` as visible to `stage`, growing the
    /// layout as needed. An existing entry for the same `(group, binding)`
    /// pair has its visibility mask extended rather than a duplicate entry
    /// appended.
    pub fn add_binding(&mut self, group: u32, binding: u32, stage: ShaderStage) {
        let group = group as usize;

        if self.bind_group_layouts.len() <= group {
            self.bind_group_layouts.resize_with(group + 1, Default::default);
        }

        let entries = &mut self.bind_group_layouts[group].entries;

        if let Some(entry) = entries.iter_mut().find(|entry| entry.binding == binding) {
            entry.visibility |= stage.into();
        } else {
            entries.push(BindGroupLayoutEntry {
                binding,
                visibility: stage.into(),
                binding_member: None,
            });
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum SpecializationConstantKind {
    Boolean,
    Float,
    Int,
    Unsigned,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct SpecializationConstant {
    pub debug_label: Option<String>,
    pub kind: SpecializationConstantKind,
}

/// Reflection output accumulated for one entry point.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct EntryPointInformation {
    pub specialization_constants: IndexMap<Symbol, SpecializationConstant>,
    pub default_layout: PipelineLayout,
}

/// Reflection output for a whole module, keyed by entry-point name.
///
/// Records must exist before the global-variable rewriter runs; the rewriter
/// treats a missing record as an internal invariant violation.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct PrepareResult {
    pub entry_points: FxHashMap<Symbol, EntryPointInformation>,
}

impl PrepareResult {
    pub fn for_entry_points(module: &Module, call_graph: &CallGraph) -> Self {
        let mut entry_points = FxHashMap::default();

        for entry_point in call_graph.entry_points() {
            let name = module.ast[entry_point.function].name;

            entry_points.insert(name, EntryPointInformation::default());
        }

        PrepareResult { entry_points }
    }
}
