//! Resolution of module-scope variable references into explicit per-entry-point
//! resource delivery.
//!
//! For every entry point, the globals it transitively reads are determined and
//! then delivered explicitly: resource-backed globals through synthesized
//! per-bind-group argument-buffer structures passed as parameters, private
//! globals through local definitions hoisted into the entry point's body, and
//! pipeline-overridable constants through reflection metadata. Helper
//! functions receive the globals they read as threaded parameters. The pass
//! assumes a validated, type-checked module; any inconsistency it encounters
//! is an internal invariant violation and panics.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use tracing::debug;

use crate::ast::{
    Block, BlockPosition, Expression, ExpressionKind, Function, Parameter, ParameterRole,
    Statement, StatementKind, Variable, VariableData,
};
use crate::call_graph::{CallGraph, EntryPoint};
use crate::reflection::{
    PipelineLayout, PrepareResult, SpecializationConstant, SpecializationConstantKind,
};
use crate::ty::{ScalarKind, Type, TypeKind};
use crate::{
    sym, Attribute, Module, ResourceBinding, ShaderStage, Struct, StructData, StructMember,
    StructureRole, Symbol, VariableFlavor,
};

/// Rewrites all entry points of `module` so that no function body references
/// a module-scope variable directly, populating per-entry-point reflection
/// records in `result` along the way.
///
/// Every entry point in `call_graph` must already have a record in `result`;
/// see [`PrepareResult::for_entry_points`].
pub fn rewrite_global_variables(
    module: &mut Module,
    call_graph: &CallGraph,
    result: &mut PrepareResult,
) {
    RewriteGlobalVariables::new(module, call_graph, result).run();
}

/// One module-scope declaration, as seen by this pass.
struct Global {
    resource: Option<ResourceBinding>,
    declaration: Variable,
}

/// The globals one entry point transitively reads, partitioned for
/// rewriting. Ephemeral; consumed immediately after classification.
struct UsedGlobals {
    resources: IndexMap<u32, IndexMap<u32, Symbol>>,
    private_globals: Vec<Symbol>,
}

/// A statement to be spliced into a block once the block's traversal has
/// finished, before the statement that was at `index` during traversal.
struct Insertion {
    statement: Statement,
    index: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AnalysisState {
    InProgress,
    Done,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Local,
    Global,
}

/// Name-resolution scopes for one function traversal. A name bound in an
/// inner scope strictly shadows any same-named module-scope declaration;
/// parameters are bound with no backing declaration.
struct ScopeStack {
    scopes: Vec<FxHashMap<Symbol, Option<Variable>>>,
}

impl ScopeStack {
    fn new() -> Self {
        ScopeStack { scopes: Vec::new() }
    }

    fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    fn define(&mut self, name: Symbol, declaration: Option<Variable>) {
        self.scopes
            .last_mut()
            .expect("no active scope")
            .insert(name, declaration);
    }

    fn lookup(&self, name: Symbol) -> Option<Option<Variable>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }
}

struct RewriteGlobalVariables<'a> {
    module: &'a mut Module,
    call_graph: &'a CallGraph,
    result: &'a mut PrepareResult,
    globals: FxHashMap<Symbol, Global>,
    /// Per group, the `(binding, global)` pairs in declaration order.
    group_binding_map: IndexMap<u32, Vec<(u32, Symbol)>>,
    /// Packed clone per resource-backed structure type; keeps repeated
    /// globals sharing a structure pointing at a single clone.
    packed_struct_types: FxHashMap<Struct, Struct>,
    /// Synthesized argument-buffer struct type per group; reset between
    /// entry points.
    struct_types: FxHashMap<u32, Type>,
    /// Transitive reads per analyzed function.
    function_reads: FxHashMap<Function, IndexSet<Symbol>>,
    analysis_state: FxHashMap<Function, AnalysisState>,
    constant_id: u32,
}

impl<'a> RewriteGlobalVariables<'a> {
    fn new(
        module: &'a mut Module,
        call_graph: &'a CallGraph,
        result: &'a mut PrepareResult,
    ) -> Self {
        RewriteGlobalVariables {
            module,
            call_graph,
            result,
            globals: FxHashMap::default(),
            group_binding_map: IndexMap::new(),
            packed_struct_types: FxHashMap::default(),
            struct_types: FxHashMap::default(),
            function_reads: FxHashMap::default(),
            analysis_state: FxHashMap::default(),
            constant_id: 0,
        }
    }

    fn run(mut self) {
        self.collect_globals();

        let entry_points = self.call_graph.entry_points().to_vec();

        for entry_point in &entry_points {
            self.analyze_function(entry_point.function);
        }

        for entry_point in entry_points {
            self.visit_entry_point(entry_point);
        }
    }

    fn argument_buffer_parameter_name(group: u32) -> Symbol {
        sym(&format!("__ArgumentBufer_{}", group))
    }

    fn argument_buffer_struct_name(group: u32) -> Symbol {
        sym(&format!("__ArgumentBuferT_{}", group))
    }

    /// The type through which a global is delivered when threaded as a
    /// parameter or aggregated into an argument-buffer member.
    fn delivery_ty(&self, declaration: Variable) -> Type {
        let data = &self.module.ast[declaration];

        data.reference_ty
            .or(data.store_ty)
            .expect("module-scope declaration without a resolved type")
    }

    // Global table construction

    fn collect_globals(&mut self) {
        let globals = self.module.globals.clone();

        for variable in globals {
            let data = &self.module.ast[variable];
            let name = data.name;

            let mut group = None;
            let mut binding = None;

            for attribute in &data.attributes {
                match attribute {
                    Attribute::Group(value) => group = Some(*value),
                    Attribute::Binding(value) => binding = Some(*value),
                }
            }

            let resource = match (group, binding) {
                (Some(group), Some(binding)) => Some(ResourceBinding { group, binding }),
                (None, None) => None,
                _ => panic!(
                    "module-scope declaration `{}` carries only one of `@group`/`@binding`",
                    name
                ),
            };

            if self
                .globals
                .insert(
                    name,
                    Global {
                        resource,
                        declaration: variable,
                    },
                )
                .is_some()
            {
                panic!("duplicate module-scope declaration `{}`", name);
            }

            if let Some(resource) = resource {
                self.group_binding_map
                    .entry(resource.group)
                    .or_default()
                    .push((resource.binding, name));

                self.pack_resource_struct(variable);
            }
        }

        debug!(
            globals = self.globals.len(),
            groups = self.group_binding_map.len(),
            "collected module-scope declarations"
        );
    }

    /// Redirects a resource-backed global of user-defined structure type to a
    /// packed clone of that structure, so host-visible layout rules apply
    /// only to the resource-facing variant. Cloning is memoized per
    /// structure: repeated globals sharing a structure reuse one clone.
    fn pack_resource_struct(&mut self, variable: Variable) {
        let Some(store_ty) = self.module.ast[variable].store_ty else {
            return;
        };

        let TypeKind::Struct(struct_handle) = self.module.ty()[store_ty] else {
            return;
        };

        let packed = if self.module.structs[struct_handle].role != StructureRole::UserDefinedResource
        {
            assert_eq!(
                self.module.structs[struct_handle].role,
                StructureRole::UserDefined,
                "only user-defined structures may back a resource binding"
            );

            self.module.structs[struct_handle].role = StructureRole::UserDefinedResource;

            let original = &self.module.structs[struct_handle];
            let packed_data = StructData {
                name: sym(&format!("__{}_Packed", original.name)),
                members: original.members.clone(),
                role: StructureRole::PackedResource,
            };
            let packed = self.module.structs.register(packed_data);

            self.packed_struct_types.insert(struct_handle, packed);

            packed
        } else {
            *self
                .packed_struct_types
                .get(&struct_handle)
                .expect("resource structure is missing its packed clone")
        };

        let packed_ty = self.module.ast.ty_mut().register(TypeKind::Struct(packed));

        let packed_reference_ty = self.module.ast[variable].reference_ty.map(|reference_ty| {
            let (space, _, access) = self.module.ty()[reference_ty].expect_reference();

            self.module.ast.ty_mut().register(TypeKind::Reference {
                space,
                base: packed_ty,
                access,
            })
        });

        let data = &mut self.module.ast[variable];

        data.store_ty = Some(packed_ty);

        if let Some(packed_reference_ty) = packed_reference_ty {
            data.reference_ty = Some(packed_reference_ty);
        }
    }

    // Usage analysis
    //
    // Two phases per function, callees strictly before callers: first the
    // function's transitive reads set is computed by traversing its body and
    // unioning its callees' sets, then (for helper functions) the reads are
    // threaded through as explicit parameters and call-site arguments. The
    // mutation never overlaps the traversal that feeds it.

    fn analyze_function(&mut self, function: Function) {
        match self.analysis_state.get(&function) {
            Some(AnalysisState::Done) => return,
            Some(AnalysisState::InProgress) => panic!(
                "recursive call graph at function `{}`",
                self.module.ast[function].name
            ),
            None => {}
        }

        self.analysis_state
            .insert(function, AnalysisState::InProgress);

        let callees = self.call_graph.callees(function).to_vec();

        for callee in &callees {
            self.analyze_function(callee.function);

            // The callee's reads were turned into parameters; every call site
            // in this function supplies the matching arguments, so this
            // function now references those globals directly.
            let callee_reads = self.function_reads[&callee.function].clone();

            for call_site in &callee.call_sites {
                for name in &callee_reads {
                    let global = &self.globals[name];
                    let ty = self.delivery_ty(global.declaration);
                    let argument = self.module.ast.make_expr_identifier(*name, ty);

                    self.module.ast.append_call_argument(*call_site, argument);
                }
            }
        }

        let mut scope = ScopeStack::new();
        let mut reads = IndexSet::new();

        scope.push();

        for parameter in &self.module.ast[function].params {
            scope.define(parameter.name, None);
        }

        let body = self.module.ast[function].body;

        self.analyze_block(body, &mut scope, &mut reads);
        scope.pop();

        for callee in &callees {
            for name in &self.function_reads[&callee.function].clone() {
                reads.insert(*name);
            }
        }

        let is_entry_point = self.module.ast[function].stage.is_some();

        if !is_entry_point && !reads.is_empty() {
            for name in &reads {
                let global = &self.globals[name];
                let ty = self.delivery_ty(global.declaration);

                self.module.ast.append_parameter(
                    function,
                    Parameter {
                        name: *name,
                        ty,
                        attributes: smallvec![],
                        role: ParameterRole::UserDefined,
                    },
                );
            }
        }

        debug!(
            function = %self.module.ast[function].name,
            reads = reads.len(),
            "analyzed function"
        );

        self.function_reads.insert(function, reads);
        self.analysis_state.insert(function, AnalysisState::Done);
    }

    fn analyze_block(&mut self, block: Block, scope: &mut ScopeStack, reads: &mut IndexSet<Symbol>) {
        scope.push();

        let mut pending = Vec::new();
        let statement_count = self.module.ast[block].len();

        for index in 0..statement_count {
            let statement = self.module.ast[block].statements()[index];

            self.analyze_statement(statement, index, scope, reads, &mut pending);
        }

        // Splicing is deferred until the whole block has been visited so
        // indices observed during traversal stay valid; each insertion shifts
        // the ones recorded after it by one.
        for (applied, insertion) in pending.into_iter().enumerate() {
            self.module.ast.insert_statement(
                block,
                BlockPosition::InsertAt(insertion.index + applied),
                insertion.statement,
            );
        }

        scope.pop();
    }

    fn analyze_statement(
        &mut self,
        statement: Statement,
        index: usize,
        scope: &mut ScopeStack,
        reads: &mut IndexSet<Symbol>,
        pending: &mut Vec<Insertion>,
    ) {
        let kind = self.module.ast[statement].kind().clone();

        match kind {
            StatementKind::Variable(variable) => {
                let data = &self.module.ast[variable];
                let name = data.name;
                let initializer = data.initializer;

                scope.define(name, Some(variable));

                if let Some(initializer) = initializer {
                    self.analyze_expression(initializer, index, scope, reads, pending);
                }
            }
            StatementKind::Assign(stmt) => {
                self.analyze_expression(stmt.lhs(), index, scope, reads, pending);
                self.analyze_expression(stmt.rhs(), index, scope, reads, pending);
            }
            StatementKind::Return(stmt) => {
                if let Some(value) = stmt.value() {
                    self.analyze_expression(value, index, scope, reads, pending);
                }
            }
            StatementKind::If(stmt) => {
                self.analyze_expression(stmt.condition(), index, scope, reads, pending);
                self.analyze_block(stmt.then_block(), scope, reads);

                if let Some(else_block) = stmt.else_block() {
                    self.analyze_block(else_block, scope, reads);
                }
            }
            StatementKind::Loop(block) => {
                self.analyze_block(block, scope, reads);
            }
            StatementKind::Compound(block) => {
                self.analyze_block(block, scope, reads);
            }
            StatementKind::Expr(expression) => {
                self.analyze_expression(expression, index, scope, reads, pending);
            }
        }
    }

    fn analyze_expression(
        &mut self,
        expression: Expression,
        index: usize,
        scope: &mut ScopeStack,
        reads: &mut IndexSet<Symbol>,
        pending: &mut Vec<Insertion>,
    ) {
        let kind = self.module.ast[expression].kind().clone();

        match kind {
            ExpressionKind::Identifier(name) => {
                if let Some(local) = scope.lookup(name) {
                    if let Some(declaration) = local {
                        self.read_variable(
                            expression,
                            declaration,
                            Context::Local,
                            index,
                            reads,
                            pending,
                        );
                    }

                    return;
                }

                if let Some(global) = self.globals.get(&name) {
                    let declaration = global.declaration;

                    self.read_variable(
                        expression,
                        declaration,
                        Context::Global,
                        index,
                        reads,
                        pending,
                    );
                }
            }
            ExpressionKind::FieldAccess(access) => {
                self.analyze_expression(access.base(), index, scope, reads, pending);
            }
            ExpressionKind::IndexAccess(access) => {
                self.analyze_expression(access.base(), index, scope, reads, pending);
                self.analyze_expression(access.index(), index, scope, reads, pending);
            }
            ExpressionKind::Call(call) => {
                for argument in call.arguments() {
                    self.analyze_expression(*argument, index, scope, reads, pending);
                }
            }
            ExpressionKind::Identity(inner) => {
                self.analyze_expression(inner, index, scope, reads, pending);
            }
            ExpressionKind::OpUnary(op) => {
                self.analyze_expression(op.operand(), index, scope, reads, pending);
            }
            ExpressionKind::OpBinary(op) => {
                self.analyze_expression(op.lhs(), index, scope, reads, pending);
                self.analyze_expression(op.rhs(), index, scope, reads, pending);
            }
            ExpressionKind::ConstU32(_)
            | ExpressionKind::ConstI32(_)
            | ExpressionKind::ConstF32(_)
            | ExpressionKind::ConstBool(_) => {}
        }
    }

    fn read_variable(
        &mut self,
        expression: Expression,
        declaration: Variable,
        context: Context,
        index: usize,
        reads: &mut IndexSet<Symbol>,
        pending: &mut Vec<Insertion>,
    ) {
        if self.module.ast[declaration].flavor != VariableFlavor::Const {
            if context == Context::Global {
                reads.insert(self.module.ast[expression].kind().expect_identifier());
            }

            return;
        }

        // Compile-time constants have no runtime storage and must not end up
        // in argument-buffer structs. Each use site instead gets its own
        // freshly-named `let` binding, initialized by the constant's
        // initializer tagged with the use site's inferred type, inserted
        // before the current statement.
        self.constant_id += 1;

        let new_name = sym(&format!("__const{}", self.constant_id));

        let data = &self.module.ast[declaration];
        let store_ty = data.store_ty;
        let initializer = data
            .initializer
            .expect("const declaration without an initializer");
        let inferred_ty = self.module.ast[expression].ty();

        let new_initializer = self.module.ast.make_expr_identity(initializer, inferred_ty);
        let new_variable = self.module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Let,
            name: new_name,
            store_ty,
            reference_ty: None,
            initializer: Some(new_initializer),
            attributes: smallvec![],
        });

        self.module.ast.rename_identifier(expression, new_name);

        let statement = self.module.ast.make_stmt_variable(new_variable);

        pending.push(Insertion { statement, index });
    }

    // Classification and rewriting

    fn visit_entry_point(&mut self, entry_point: EntryPoint) {
        self.struct_types.clear();

        let function = entry_point.function;
        let name = self.module.ast[function].name;

        assert!(
            self.result.entry_points.contains_key(&name),
            "entry point `{}` is missing from the reflection map",
            name
        );

        let reads = self.function_reads[&function].clone();

        if reads.is_empty() {
            return;
        }

        let mut pipeline_layout = PipelineLayout::default();
        let used_globals =
            self.determine_used_globals(name, &reads, entry_point.stage, &mut pipeline_layout);

        self.insert_structs(&used_globals.resources);
        self.insert_parameters(function, &used_globals.resources);

        // Both kinds of front-of-body statements are collected first and
        // spliced in one batch: materializations in group-then-binding order,
        // then hoisted private definitions in encounter order.
        let mut front = Vec::new();

        self.insert_materializations(&used_globals.resources, &mut front);
        self.insert_local_definitions(&used_globals.private_globals, &mut front);

        let body = self.module.ast[function].body;

        for (index, statement) in front.into_iter().enumerate() {
            self.module
                .ast
                .insert_statement(body, BlockPosition::InsertAt(index), statement);
        }

        self.result
            .entry_points
            .get_mut(&name)
            .expect("entry point is missing from the reflection map")
            .default_layout = pipeline_layout;

        debug!(entry_point = %name, reads = reads.len(), "rewrote entry point");
    }

    fn determine_used_globals(
        &mut self,
        entry_point: Symbol,
        reads: &IndexSet<Symbol>,
        stage: ShaderStage,
        pipeline_layout: &mut PipelineLayout,
    ) -> UsedGlobals {
        let mut used_globals = UsedGlobals {
            resources: IndexMap::new(),
            private_globals: Vec::new(),
        };

        for name in reads {
            let global = self
                .globals
                .get(name)
                .expect("read of an unknown module-scope declaration");
            let declaration = global.declaration;
            let resource = global.resource;

            match self.module.ast[declaration].flavor {
                VariableFlavor::Override => {
                    self.uses_override(entry_point, declaration);
                    continue;
                }
                VariableFlavor::Var | VariableFlavor::Let | VariableFlavor::Const => {
                    if resource.is_none() {
                        used_globals.private_globals.push(*name);
                        continue;
                    }
                }
            }

            let ResourceBinding { group, binding } =
                resource.expect("resource-backed global without binding coordinates");

            used_globals
                .resources
                .entry(group)
                .or_default()
                .insert(binding, *name);

            pipeline_layout.add_binding(group, binding, stage);
        }

        for bindings in used_globals.resources.values_mut() {
            bindings.sort_keys();
        }

        used_globals.resources.sort_keys();

        used_globals
    }

    fn uses_override(&mut self, entry_point: Symbol, declaration: Variable) {
        let data = &self.module.ast[declaration];
        let store_ty = data
            .store_ty
            .expect("override declaration without a resolved type");

        let kind = match self.module.ty()[store_ty] {
            TypeKind::Scalar(ScalarKind::Bool) => SpecializationConstantKind::Boolean,
            TypeKind::Scalar(ScalarKind::F32) => SpecializationConstantKind::Float,
            TypeKind::Scalar(ScalarKind::I32) => SpecializationConstantKind::Int,
            TypeKind::Scalar(ScalarKind::U32) => SpecializationConstantKind::Unsigned,
            _ => panic!(
                "override `{}` must have a concrete scalar numeric or boolean type",
                data.name
            ),
        };

        let name = data.name;

        self.result
            .entry_points
            .get_mut(&entry_point)
            .expect("entry point is missing from the reflection map")
            .specialization_constants
            .insert(name, SpecializationConstant {
                debug_label: None,
                kind,
            });
    }

    /// For every bind group with at least one used binding, synthesizes the
    /// argument-buffer structure aggregating the group's used bindings, one
    /// member per binding in the group's declaration order.
    fn insert_structs(&mut self, used_resources: &IndexMap<u32, IndexMap<u32, Symbol>>) {
        let group_binding_map = self.group_binding_map.clone();

        for (group, binding_globals) in &group_binding_map {
            let Some(used_bindings) = used_resources.get(group) else {
                continue;
            };

            let mut members = Vec::new();

            for (binding, name) in binding_globals {
                if !used_bindings.contains_key(binding) {
                    continue;
                }

                let declaration = self.globals[name].declaration;
                let field = self.field_name(declaration);
                let ty = self.delivery_ty(declaration);

                members.push(StructMember {
                    name: field,
                    ty,
                    attributes: smallvec![Attribute::Binding(*binding)],
                });
            }

            let struct_handle = self.module.structs.register(StructData {
                name: Self::argument_buffer_struct_name(*group),
                members,
                role: StructureRole::BindGroup,
            });
            let struct_ty = self
                .module
                .ast
                .ty_mut()
                .register(TypeKind::Struct(struct_handle));

            self.struct_types.insert(*group, struct_ty);
        }
    }

    fn insert_parameters(
        &mut self,
        function: Function,
        used_resources: &IndexMap<u32, IndexMap<u32, Symbol>>,
    ) {
        for group in used_resources.keys() {
            let ty = self.struct_types[group];

            self.module.ast.append_parameter(
                function,
                Parameter {
                    name: Self::argument_buffer_parameter_name(*group),
                    ty,
                    attributes: smallvec![Attribute::Group(*group)],
                    role: ParameterRole::BindGroup,
                },
            );
        }
    }

    /// Projects every used resource binding out of its group parameter and
    /// back into the global's original name, in group-then-binding order.
    fn insert_materializations(
        &mut self,
        used_resources: &IndexMap<u32, IndexMap<u32, Symbol>>,
        front: &mut Vec<Statement>,
    ) {
        for (group, bindings) in used_resources {
            let struct_ty = self.struct_types[group];
            let argument = self
                .module
                .ast
                .make_expr_identifier(Self::argument_buffer_parameter_name(*group), struct_ty);

            for name in bindings.values() {
                let declaration = self.globals[name].declaration;
                let field = self.field_name(declaration);

                if field != *name {
                    self.module.set_uses_external_textures();
                }

                let ty = self.delivery_ty(declaration);
                let access = self.module.ast.make_expr_field_access(argument, field, ty);

                let data = &self.module.ast[declaration];
                let store_ty = data.store_ty;
                let reference_ty = data.reference_ty;

                let local = self.module.ast.declare_variable(VariableData {
                    flavor: VariableFlavor::Let,
                    name: *name,
                    store_ty,
                    reference_ty,
                    initializer: Some(access),
                    attributes: smallvec![],
                });

                front.push(self.module.ast.make_stmt_variable(local));
            }
        }
    }

    /// Hoists every used private global's declaration into the entry point's
    /// body, in encounter order. The declaration node itself is reused.
    fn insert_local_definitions(&mut self, private_globals: &[Symbol], front: &mut Vec<Statement>) {
        for name in private_globals {
            let declaration = self.globals[name].declaration;

            front.push(self.module.ast.make_stmt_variable(declaration));
        }
    }

    /// A global's field name inside its argument-buffer struct. External
    /// textures are renamed with a `__` prefix so the original name stays
    /// free for the synthesized accessor.
    fn field_name(&self, declaration: Variable) -> Symbol {
        let data = &self.module.ast[declaration];

        let is_external_texture = data
            .store_ty
            .map(|ty| matches!(self.module.ty()[ty], TypeKind::TextureExternal))
            .unwrap_or(false);

        if is_external_texture {
            sym(&format!("__{}", data.name))
        } else {
            data.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, BlockPosition, UnaryOperator};
    use crate::reflection::ShaderStages;
    use crate::ty::{TY_F32, TY_I32, TY_TEXTURE_EXTERNAL};
    use crate::{AccessMode, AddressSpace};

    fn uniform_global(module: &mut Module, name: &str, group: u32, binding: u32) -> Variable {
        let reference_ty = module.ast.ty_mut().register(TypeKind::Reference {
            space: AddressSpace::Uniform,
            base: TY_F32,
            access: AccessMode::Read,
        });
        let variable = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Var,
            name: sym(name),
            store_ty: Some(TY_F32),
            reference_ty: Some(reference_ty),
            initializer: None,
            attributes: smallvec![Attribute::Group(group), Attribute::Binding(binding)],
        });

        module.globals.push(variable);

        variable
    }

    fn private_global(module: &mut Module, name: &str) -> Variable {
        let reference_ty = module.ast.ty_mut().register(TypeKind::Reference {
            space: AddressSpace::Private,
            base: TY_F32,
            access: AccessMode::ReadWrite,
        });
        let initializer = module.ast.make_expr_const_f32(0.0);
        let variable = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Var,
            name: sym(name),
            store_ty: Some(TY_F32),
            reference_ty: Some(reference_ty),
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module.globals.push(variable);

        variable
    }

    fn use_global(module: &mut Module, block: Block, name: &str) -> Expression {
        let expression = module.ast.make_expr_identifier(sym(name), TY_F32);

        module
            .ast
            .add_stmt_expr(block, BlockPosition::Append, expression);

        expression
    }

    fn run(module: &mut Module) -> PrepareResult {
        let call_graph = CallGraph::build(module);
        let mut result = PrepareResult::for_entry_points(module, &call_graph);

        rewrite_global_variables(module, &call_graph, &mut result);

        result
    }

    fn block_statements(module: &Module, block: Block) -> Vec<Statement> {
        module.ast[block].statements().iter().copied().collect()
    }

    #[test]
    fn entry_point_without_global_reads_is_untouched() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "unused", 0, 0);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let initializer = module.ast.make_expr_const_f32(1.0);
        let local = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Let,
            name: sym("x"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module
            .ast
            .add_stmt_variable(body, BlockPosition::Append, local);

        let result = run(&mut module);

        assert!(module.ast[main].params.is_empty());
        assert_eq!(module.ast[body].len(), 1);
        assert!(result.entry_points[&sym("main")]
            .default_layout
            .bind_group_layouts
            .is_empty());
    }

    #[test]
    fn resource_global_generates_struct_parameter_and_materialization() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);

        let b = private_global(&mut module, "b");

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;

        use_global(&mut module, body, "a");
        use_global(&mut module, body, "b");

        let result = run(&mut module);

        let params = &module.ast[main].params;

        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, sym("__ArgumentBufer_0"));
        assert_eq!(params[0].role, ParameterRole::BindGroup);
        assert_eq!(&params[0].attributes[..], &[Attribute::Group(0)]);

        let struct_handle = module.ty()[params[0].ty].expect_struct();
        let struct_data = &module.structs[struct_handle];

        assert_eq!(struct_data.name, sym("__ArgumentBuferT_0"));
        assert_eq!(struct_data.role, StructureRole::BindGroup);
        assert_eq!(struct_data.members.len(), 1);
        assert_eq!(struct_data.members[0].name, sym("a"));
        assert_eq!(
            &struct_data.members[0].attributes[..],
            &[Attribute::Binding(0)]
        );

        let statements = block_statements(&module, body);

        assert_eq!(statements.len(), 4);

        let materialized = module.ast[statements[0]].kind().expect_variable();
        let data = &module.ast[materialized];

        assert_eq!(data.name, sym("a"));
        assert_eq!(data.flavor, VariableFlavor::Let);

        let access = module.ast[data.initializer.unwrap()]
            .kind()
            .expect_field_access();

        assert_eq!(access.field(), sym("a"));
        assert_eq!(
            module.ast[access.base()].kind().expect_identifier(),
            sym("__ArgumentBufer_0")
        );

        // The private global's declaration node itself is hoisted.
        assert_eq!(module.ast[statements[1]].kind().expect_variable(), b);

        let entries = &result.entry_points[&sym("main")]
            .default_layout
            .bind_group_layouts[0]
            .entries;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 0);
        assert_eq!(entries[0].visibility, ShaderStages::COMPUTE);
    }

    #[test]
    fn const_uses_get_fresh_local_bindings() {
        let mut module = Module::new(sym("test"));

        let initializer = module.ast.make_expr_const_f32(1.0);
        let constant = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Const,
            name: sym("c"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module.globals.push(constant);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;

        let use_0 = use_global(&mut module, body, "c");
        let use_1 = use_global(&mut module, body, "c");

        run(&mut module);

        let statements = block_statements(&module, body);

        assert_eq!(statements.len(), 4);

        let first = module.ast[statements[0]].kind().expect_variable();
        let first_data = &module.ast[first];

        assert_eq!(first_data.name, sym("__const1"));
        assert_eq!(first_data.flavor, VariableFlavor::Let);
        assert_eq!(
            module.ast[first_data.initializer.unwrap()]
                .kind()
                .expect_identity(),
            initializer
        );

        let third = module.ast[statements[2]].kind().expect_variable();

        assert_eq!(module.ast[third].name, sym("__const2"));

        // Use sites are renamed to the fresh bindings in place.
        assert_eq!(module.ast[use_0].kind().expect_identifier(), sym("__const1"));
        assert_eq!(module.ast[use_1].kind().expect_identifier(), sym("__const2"));

        assert!(module.ast[main].params.is_empty());
    }

    #[test]
    fn override_recorded_as_specialization_constant() {
        let mut module = Module::new(sym("test"));

        let initializer = module.ast.make_expr_const_i32(2);
        let factor = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Override,
            name: sym("factor"),
            store_ty: Some(TY_I32),
            reference_ty: None,
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module.globals.push(factor);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let use_site = module.ast.make_expr_identifier(sym("factor"), TY_I32);

        module
            .ast
            .add_stmt_expr(body, BlockPosition::Append, use_site);

        let result = run(&mut module);

        let info = &result.entry_points[&sym("main")];

        assert_eq!(info.specialization_constants.len(), 1);
        assert_eq!(
            info.specialization_constants[&sym("factor")].kind,
            SpecializationConstantKind::Int
        );

        // No runtime delivery is synthesized for an override.
        assert!(module.ast[main].params.is_empty());
        assert_eq!(module.ast[body].len(), 1);
        assert!(info.default_layout.bind_group_layouts.is_empty());
    }

    #[test]
    fn struct_packing_is_memoized() {
        let mut module = Module::new(sym("test"));

        let light = module.structs.register(StructData {
            name: sym("Light"),
            members: vec![StructMember {
                name: sym("intensity"),
                ty: TY_F32,
                attributes: smallvec![],
            }],
            role: StructureRole::UserDefined,
        });
        let light_ty = module.ast.ty_mut().register(TypeKind::Struct(light));

        let mut light_global = |module: &mut Module, name: &str, binding: u32| {
            let reference_ty = module.ast.ty_mut().register(TypeKind::Reference {
                space: AddressSpace::Uniform,
                base: light_ty,
                access: AccessMode::Read,
            });
            let variable = module.ast.declare_variable(VariableData {
                flavor: VariableFlavor::Var,
                name: sym(name),
                store_ty: Some(light_ty),
                reference_ty: Some(reference_ty),
                initializer: None,
                attributes: smallvec![Attribute::Group(0), Attribute::Binding(binding)],
            });

            module.globals.push(variable);

            variable
        };

        let l0 = light_global(&mut module, "l0", 0);
        let l1 = light_global(&mut module, "l1", 1);

        run(&mut module);

        assert_eq!(
            module.structs[light].role,
            StructureRole::UserDefinedResource
        );

        let packed_count = module
            .structs
            .iter()
            .filter(|s| module.structs[*s].role == StructureRole::PackedResource)
            .count();

        assert_eq!(packed_count, 1);

        let packed_0 = module.ty()[module.ast[l0].store_ty.unwrap()].expect_struct();
        let packed_1 = module.ty()[module.ast[l1].store_ty.unwrap()].expect_struct();

        assert_eq!(packed_0, packed_1);
        assert_ne!(packed_0, light);
        assert_eq!(module.structs[packed_0].name, sym("__Light_Packed"));

        let (_, base, _) = module.ty()[module.ast[l0].reference_ty.unwrap()].expect_reference();

        assert_eq!(module.ty()[base].expect_struct(), packed_0);
    }

    #[test]
    fn callee_reads_are_threaded_through_parameters() {
        let mut module = Module::new(sym("test"));

        let a = uniform_global(&mut module, "a", 0, 0);
        let a_ty = module.ast[a].reference_ty.unwrap();

        let helper = module
            .ast
            .add_function(sym("helper"), vec![], Some(TY_F32), None);
        let helper_body = module.ast[helper].body;
        let a_use = module.ast.make_expr_identifier(sym("a"), TY_F32);

        module
            .ast
            .add_stmt_return(helper_body, BlockPosition::Append, Some(a_use));

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let main_body = module.ast[main].body;
        let call = module.ast.make_expr_call(helper, [], TY_F32);

        module
            .ast
            .add_stmt_expr(main_body, BlockPosition::Append, call);

        run(&mut module);

        let helper_params = &module.ast[helper].params;

        assert_eq!(helper_params.len(), 1);
        assert_eq!(helper_params[0].name, sym("a"));
        assert_eq!(helper_params[0].role, ParameterRole::UserDefined);
        assert_eq!(helper_params[0].ty, a_ty);

        let arguments = module.ast[call].kind().expect_call().arguments().to_vec();

        assert_eq!(arguments.len(), 1);
        assert_eq!(module.ast[arguments[0]].kind().expect_identifier(), sym("a"));

        let main_params = &module.ast[main].params;

        assert_eq!(main_params.len(), 1);
        assert_eq!(main_params[0].name, sym("__ArgumentBufer_0"));

        // The caller materializes `a` in front of the call.
        let statements = block_statements(&module, main_body);

        assert_eq!(statements.len(), 2);

        let materialized = module.ast[statements[0]].kind().expect_variable();

        assert_eq!(module.ast[materialized].name, sym("a"));
    }

    #[test]
    #[should_panic(expected = "recursive call graph")]
    fn recursive_call_graph_panics() {
        let mut module = Module::new(sym("test"));

        let looping = module
            .ast
            .add_function(sym("looping"), vec![], Some(TY_F32), None);
        let looping_body = module.ast[looping].body;
        let self_call = module.ast.make_expr_call(looping, [], TY_F32);

        module
            .ast
            .add_stmt_expr(looping_body, BlockPosition::Append, self_call);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let main_body = module.ast[main].body;
        let call = module.ast.make_expr_call(looping, [], TY_F32);

        module
            .ast
            .add_stmt_expr(main_body, BlockPosition::Append, call);

        run(&mut module);
    }

    #[test]
    fn locals_shadow_module_scope_declarations() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let initializer = module.ast.make_expr_const_f32(1.0);
        let shadow = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Let,
            name: sym("a"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module
            .ast
            .add_stmt_variable(body, BlockPosition::Append, shadow);
        use_global(&mut module, body, "a");

        let result = run(&mut module);

        assert!(module.ast[main].params.is_empty());
        assert_eq!(module.ast[body].len(), 2);
        assert!(result.entry_points[&sym("main")]
            .default_layout
            .bind_group_layouts
            .is_empty());
    }

    #[test]
    fn external_texture_member_is_renamed() {
        let mut module = Module::new(sym("test"));

        let texture = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Var,
            name: sym("tex"),
            store_ty: Some(TY_TEXTURE_EXTERNAL),
            reference_ty: None,
            initializer: None,
            attributes: smallvec![Attribute::Group(0), Attribute::Binding(0)],
        });

        module.globals.push(texture);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Fragment));
        let body = module.ast[main].body;
        let use_site = module.ast.make_expr_identifier(sym("tex"), TY_TEXTURE_EXTERNAL);

        module
            .ast
            .add_stmt_expr(body, BlockPosition::Append, use_site);

        run(&mut module);

        assert!(module.uses_external_textures());

        let struct_handle = module.ty()[module.ast[main].params[0].ty].expect_struct();

        assert_eq!(module.structs[struct_handle].members[0].name, sym("__tex"));

        let statements = block_statements(&module, body);
        let materialized = module.ast[statements[0]].kind().expect_variable();
        let data = &module.ast[materialized];

        assert_eq!(data.name, sym("tex"));

        let access = module.ast[data.initializer.unwrap()]
            .kind()
            .expect_field_access();

        assert_eq!(access.field(), sym("__tex"));
    }

    #[test]
    fn bindings_materialize_in_group_then_binding_order() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 1);
        uniform_global(&mut module, "b", 0, 0);
        uniform_global(&mut module, "c", 1, 0);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;

        use_global(&mut module, body, "c");
        use_global(&mut module, body, "a");
        use_global(&mut module, body, "b");

        run(&mut module);

        let params = &module.ast[main].params;

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, sym("__ArgumentBufer_0"));
        assert_eq!(params[1].name, sym("__ArgumentBufer_1"));

        let statements = block_statements(&module, body);

        assert_eq!(statements.len(), 6);

        let front_names = statements[..3]
            .iter()
            .map(|statement| {
                let variable = module.ast[*statement].kind().expect_variable();

                module.ast[variable].name
            })
            .collect::<Vec<_>>();

        assert_eq!(front_names, vec![sym("b"), sym("a"), sym("c")]);
    }

    #[test]
    fn only_used_bindings_become_members_and_entries() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);
        uniform_global(&mut module, "b", 0, 1);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Vertex));
        let body = module.ast[main].body;

        use_global(&mut module, body, "b");

        let result = run(&mut module);

        let struct_handle = module.ty()[module.ast[main].params[0].ty].expect_struct();
        let members = &module.structs[struct_handle].members;

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, sym("b"));
        assert_eq!(&members[0].attributes[..], &[Attribute::Binding(1)]);

        let entries = &result.entry_points[&sym("main")]
            .default_layout
            .bind_group_layouts[0]
            .entries;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 1);
        assert_eq!(entries[0].visibility, ShaderStages::VERTEX);
    }

    #[test]
    #[should_panic(expected = "duplicate module-scope declaration")]
    fn duplicate_module_scope_names_panic() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);
        uniform_global(&mut module, "a", 0, 1);

        run(&mut module);
    }

    #[test]
    #[should_panic(expected = "only one of")]
    fn group_without_binding_panics() {
        let mut module = Module::new(sym("test"));

        let variable = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Var,
            name: sym("a"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: None,
            attributes: smallvec![Attribute::Group(0)],
        });

        module.globals.push(variable);

        run(&mut module);
    }

    #[test]
    fn const_rewrite_lands_in_enclosing_inner_block() {
        let mut module = Module::new(sym("test"));

        let initializer = module.ast.make_expr_const_f32(1.0);
        let constant = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Const,
            name: sym("c"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(initializer),
            attributes: smallvec![],
        });

        module.globals.push(constant);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let condition = module.ast.make_expr_const_bool(true);
        let (if_statement, then_block) =
            module.ast.add_stmt_if(body, BlockPosition::Append, condition);

        // A leading statement inside the branch, so the insertion index within
        // the inner block is observable.
        let local_init = module.ast.make_expr_const_f32(0.0);
        let local = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Let,
            name: sym("y"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(local_init),
            attributes: smallvec![],
        });

        module
            .ast
            .add_stmt_variable(then_block, BlockPosition::Append, local);

        let use_then = use_global(&mut module, then_block, "c");

        let else_block = module.ast.add_else_block(if_statement);
        let use_else = use_global(&mut module, else_block, "c");

        run(&mut module);

        // The outer body still holds only the if statement.
        assert_eq!(module.ast[body].len(), 1);

        let statements = block_statements(&module, body);
        let stmt = module.ast[statements[0]].kind().expect_if();

        assert_eq!(stmt.then_block(), then_block);
        assert_eq!(stmt.else_block(), Some(else_block));

        let then_statements = block_statements(&module, then_block);

        assert_eq!(then_statements.len(), 3);
        assert_eq!(module.ast[then_statements[0]].kind().expect_variable(), local);

        let fresh = module.ast[then_statements[1]].kind().expect_variable();

        assert_eq!(module.ast[fresh].name, sym("__const1"));
        assert_eq!(module.ast[use_then].kind().expect_identifier(), sym("__const1"));

        let else_statements = block_statements(&module, else_block);

        assert_eq!(else_statements.len(), 2);

        let fresh = module.ast[else_statements[0]].kind().expect_variable();

        assert_eq!(module.ast[fresh].name, sym("__const2"));
        assert_eq!(module.ast[use_else].kind().expect_identifier(), sym("__const2"));
    }

    #[test]
    fn shadowing_ends_at_block_close() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let (compound, inner) = module.ast.add_stmt_compound(body, BlockPosition::Append);
        let shadow_init = module.ast.make_expr_const_f32(1.0);
        let shadow = module.ast.declare_variable(VariableData {
            flavor: VariableFlavor::Let,
            name: sym("a"),
            store_ty: Some(TY_F32),
            reference_ty: None,
            initializer: Some(shadow_init),
            attributes: smallvec![],
        });

        module
            .ast
            .add_stmt_variable(inner, BlockPosition::Append, shadow);

        let inner_use = use_global(&mut module, inner, "a");
        let outer_use = use_global(&mut module, body, "a");

        run(&mut module);

        // The read after the block closes resolves to the global again.
        let params = &module.ast[main].params;

        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, sym("__ArgumentBufer_0"));

        let statements = block_statements(&module, body);

        assert_eq!(statements.len(), 3);

        let materialized = module.ast[statements[0]].kind().expect_variable();

        assert_eq!(module.ast[materialized].name, sym("a"));
        assert_eq!(statements[1], compound);

        let trailing = module.ast[statements[2]].kind().expect_expr();

        assert_eq!(trailing, outer_use);
        assert_eq!(module.ast[trailing].kind().expect_identifier(), sym("a"));

        // The shadowed read inside the block is untouched.
        assert_eq!(module.ast[inner].len(), 2);
        assert_eq!(module.ast[inner_use].kind().expect_identifier(), sym("a"));
    }

    #[test]
    fn reads_inside_loops_and_operators_are_recorded() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "items", 0, 0);
        uniform_global(&mut module, "scale", 0, 1);

        let main = module
            .ast
            .add_function(sym("main"), vec![], None, Some(ShaderStage::Compute));
        let body = module.ast[main].body;
        let (_, loop_block) = module.ast.add_stmt_loop(body, BlockPosition::Append);

        let base = module.ast.make_expr_identifier(sym("items"), TY_F32);
        let index = module.ast.make_expr_const_u32(0);
        let lhs = module.ast.make_expr_index_access(base, index, TY_F32);

        let scale_use = module.ast.make_expr_identifier(sym("scale"), TY_F32);
        let negated = module.ast.make_expr_op_unary(UnaryOperator::Neg, scale_use);
        let two = module.ast.make_expr_const_f32(2.0);
        let rhs = module.ast.make_expr_op_binary(BinaryOperator::Mul, negated, two);

        module
            .ast
            .add_stmt_assign(loop_block, BlockPosition::Append, lhs, rhs);

        run(&mut module);

        let params = &module.ast[main].params;

        assert_eq!(params.len(), 1);
        assert!(module.ty()[params[0].ty].is_struct());

        let struct_handle = module.ty()[params[0].ty].expect_struct();

        assert_eq!(module.structs[struct_handle].members.len(), 2);

        // Materializations precede the loop; the loop body is untouched.
        let statements = block_statements(&module, body);

        assert_eq!(statements.len(), 3);

        let first = module.ast[statements[0]].kind().expect_variable();
        let second = module.ast[statements[1]].kind().expect_variable();

        assert_eq!(module.ast[first].name, sym("items"));
        assert_eq!(module.ast[second].name, sym("scale"));
        assert_eq!(module.ast[loop_block].len(), 1);
    }

    #[test]
    fn shared_helper_gains_parameters_once() {
        let mut module = Module::new(sym("test"));

        uniform_global(&mut module, "a", 0, 0);

        let inner_helper = module
            .ast
            .add_function(sym("inner_helper"), vec![], Some(TY_F32), None);
        let inner_body = module.ast[inner_helper].body;
        let a_use = module.ast.make_expr_identifier(sym("a"), TY_F32);

        module
            .ast
            .add_stmt_return(inner_body, BlockPosition::Append, Some(a_use));

        let outer_helper = module
            .ast
            .add_function(sym("outer_helper"), vec![], Some(TY_F32), None);
        let outer_body = module.ast[outer_helper].body;
        let inner_call = module.ast.make_expr_call(inner_helper, [], TY_F32);

        module
            .ast
            .add_stmt_return(outer_body, BlockPosition::Append, Some(inner_call));

        let main_0 = module
            .ast
            .add_function(sym("main_0"), vec![], None, Some(ShaderStage::Compute));
        let body_0 = module.ast[main_0].body;
        let call_0 = module.ast.make_expr_call(outer_helper, [], TY_F32);

        module
            .ast
            .add_stmt_expr(body_0, BlockPosition::Append, call_0);

        let main_1 = module
            .ast
            .add_function(sym("main_1"), vec![], None, Some(ShaderStage::Fragment));
        let body_1 = module.ast[main_1].body;
        let call_1 = module.ast.make_expr_call(outer_helper, [], TY_F32);

        module
            .ast
            .add_stmt_expr(body_1, BlockPosition::Append, call_1);

        let result = run(&mut module);

        // Each helper gains the threaded parameter exactly once, even though
        // two entry points reach it.
        let inner_params = &module.ast[inner_helper].params;

        assert_eq!(inner_params.len(), 1);
        assert_eq!(inner_params[0].name, sym("a"));
        assert_eq!(inner_params[0].role, ParameterRole::UserDefined);

        let outer_params = &module.ast[outer_helper].params;

        assert_eq!(outer_params.len(), 1);
        assert_eq!(outer_params[0].name, sym("a"));

        // The chained call site inside the outer helper received its argument.
        let outer_statements = block_statements(&module, outer_body);
        let returned = module.ast[outer_statements[0]]
            .kind()
            .expect_return()
            .value()
            .unwrap();
        let arguments = module.ast[returned].kind().expect_call().arguments().to_vec();

        assert_eq!(arguments.len(), 1);
        assert_eq!(module.ast[arguments[0]].kind().expect_identifier(), sym("a"));

        // Both entry points deliver the global independently.
        for (main, body, call) in [(main_0, body_0, call_0), (main_1, body_1, call_1)] {
            let params = &module.ast[main].params;

            assert_eq!(params.len(), 1);
            assert_eq!(params[0].name, sym("__ArgumentBufer_0"));

            let statements = block_statements(&module, body);

            assert_eq!(statements.len(), 2);

            let materialized = module.ast[statements[0]].kind().expect_variable();

            assert_eq!(module.ast[materialized].name, sym("a"));

            let arguments = module.ast[call].kind().expect_call().arguments();

            assert_eq!(arguments.len(), 1);
        }

        let visibility = |name: &str| {
            result.entry_points[&sym(name)].default_layout.bind_group_layouts[0].entries[0]
                .visibility
        };

        assert_eq!(visibility("main_0"), ShaderStages::COMPUTE);
        assert_eq!(visibility("main_1"), ShaderStages::FRAGMENT);
    }
}
