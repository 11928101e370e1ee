use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::visit::{self, TopDownVisitor};
use crate::ast::{Ast, Expression, ExpressionKind, Function};
use crate::{Module, ShaderStage};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct EntryPoint {
    pub function: Function,
    pub stage: ShaderStage,
}

/// One statically-determined callee of a function, with every call expression
/// through which it is invoked.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Callee {
    pub function: Function,
    pub call_sites: Vec<Expression>,
}

struct CallCollector {
    calls: IndexMap<Function, Vec<Expression>>,
}

impl TopDownVisitor for CallCollector {
    fn visit_expression(&mut self, ast: &Ast, expression: Expression) {
        if let ExpressionKind::Call(call) = ast[expression].kind() {
            self.calls
                .entry(call.callee())
                .or_default()
                .push(expression);
        }

        visit::visit_expression_top_down(self, ast, expression);
    }
}

/// The static call structure of a module: its entry points (with shader
/// stage) and, per function, the callees it invokes directly.
///
/// Transitive closure is not precomputed; passes that need whole-call-tree
/// information recurse through [`callees`](CallGraph::callees) themselves.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CallGraph {
    entry_points: Vec<EntryPoint>,
    callees: FxHashMap<Function, Vec<Callee>>,
}

impl CallGraph {
    pub fn build(module: &Module) -> Self {
        let mut entry_points = Vec::new();
        let mut callees = FxHashMap::default();

        for function in module.ast.functions() {
            let data = &module.ast[function];

            if let Some(stage) = data.stage {
                entry_points.push(EntryPoint { function, stage });
            }

            let mut collector = CallCollector {
                calls: IndexMap::new(),
            };

            collector.visit_block(&module.ast, data.body);

            let function_callees = collector
                .calls
                .into_iter()
                .map(|(callee, call_sites)| Callee {
                    function: callee,
                    call_sites,
                })
                .collect();

            callees.insert(function, function_callees);
        }

        CallGraph {
            entry_points,
            callees,
        }
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn callees(&self, function: Function) -> &[Callee] {
        self.callees
            .get(&function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
