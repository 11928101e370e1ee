pub mod visit;

use std::fmt;
use std::fmt::Display;
use std::ops::{Index, IndexMut};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::ty::{Type, TypeRegistry, TY_BOOL, TY_F32, TY_I32, TY_U32};
use crate::{AttributeList, ShaderStage, Symbol, VariableFlavor};

slotmap::new_key_type! {
    pub struct Expression;
    pub struct Statement;
    pub struct Block;
    pub struct Variable;
    pub struct Function;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum UnaryOperator {
    Not,
    Neg,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Neg => write!(f, "-"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum BinaryOperator {
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::And => write!(f, "&&"),
            BinaryOperator::Or => write!(f, "||"),
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Sub => write!(f, "-"),
            BinaryOperator::Mul => write!(f, "*"),
            BinaryOperator::Div => write!(f, "/"),
            BinaryOperator::Mod => write!(f, "%"),
            BinaryOperator::Eq => write!(f, "=="),
            BinaryOperator::NotEq => write!(f, "!="),
            BinaryOperator::Gt => write!(f, ">"),
            BinaryOperator::GtEq => write!(f, ">="),
            BinaryOperator::Lt => write!(f, "<"),
            BinaryOperator::LtEq => write!(f, "<="),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ExpressionData {
    ty: Type,
    kind: ExpressionKind,
}

impl ExpressionData {
    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FieldAccess {
    base: Expression,
    field: Symbol,
}

impl FieldAccess {
    pub fn base(&self) -> Expression {
        self.base
    }

    pub fn field(&self) -> Symbol {
        self.field
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Call {
    callee: Function,
    arguments: Vec<Expression>,
}

impl Call {
    pub fn callee(&self) -> Function {
        self.callee
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct OpUnary {
    operator: UnaryOperator,
    operand: Expression,
}

impl OpUnary {
    pub fn operator(&self) -> UnaryOperator {
        self.operator
    }

    pub fn operand(&self) -> Expression {
        self.operand
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct OpBinary {
    operator: BinaryOperator,
    lhs: Expression,
    rhs: Expression,
}

impl OpBinary {
    pub fn operator(&self) -> BinaryOperator {
        self.operator
    }

    pub fn lhs(&self) -> Expression {
        self.lhs
    }

    pub fn rhs(&self) -> Expression {
        self.rhs
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct IndexAccess {
    base: Expression,
    index: Expression,
}

impl IndexAccess {
    pub fn base(&self) -> Expression {
        self.base
    }

    pub fn index(&self) -> Expression {
        self.index
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum ExpressionKind {
    /// A reference to a named declaration; resolution to a local or a
    /// module-scope declaration happens by scope during analysis.
    Identifier(Symbol),
    FieldAccess(FieldAccess),
    IndexAccess(IndexAccess),
    Call(Call),
    /// A transparent wrapper around another expression, carrying its own
    /// inferred type. Used when an initializer is duplicated into a new
    /// binding whose use site resolved to a different concretization.
    Identity(Expression),
    ConstU32(u32),
    ConstI32(i32),
    ConstF32(f32),
    ConstBool(bool),
    OpUnary(OpUnary),
    OpBinary(OpBinary),
}

impl ExpressionKind {
    pub fn expect_identifier(&self) -> Symbol {
        if let ExpressionKind::Identifier(name) = self {
            *name
        } else {
            panic!("expected an identifier expression");
        }
    }

    pub fn expect_field_access(&self) -> &FieldAccess {
        if let ExpressionKind::FieldAccess(access) = self {
            access
        } else {
            panic!("expected a field-access expression");
        }
    }

    pub fn expect_call(&self) -> &Call {
        if let ExpressionKind::Call(call) = self {
            call
        } else {
            panic!("expected a call expression");
        }
    }

    pub fn expect_identity(&self) -> Expression {
        if let ExpressionKind::Identity(inner) = self {
            *inner
        } else {
            panic!("expected an identity expression");
        }
    }
}

/// A variable declaration, either module-scope or function-local.
///
/// The same node may appear both in [`Module::globals`](crate::Module) and,
/// after rewriting, inside a function body as a hoisted local definition.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct VariableData {
    pub flavor: VariableFlavor,
    pub name: Symbol,
    /// The declaration's resolved store type.
    pub store_ty: Option<Type>,
    /// For module-scope `var` declarations, the reference type through which
    /// the variable is accessed.
    pub reference_ty: Option<Type>,
    pub initializer: Option<Expression>,
    pub attributes: AttributeList,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Assign {
    lhs: Expression,
    rhs: Expression,
}

impl Assign {
    pub fn lhs(&self) -> Expression {
        self.lhs
    }

    pub fn rhs(&self) -> Expression {
        self.rhs
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct If {
    condition: Expression,
    then_block: Block,
    else_block: Option<Block>,
}

impl If {
    pub fn condition(&self) -> Expression {
        self.condition
    }

    pub fn then_block(&self) -> Block {
        self.then_block
    }

    pub fn else_block(&self) -> Option<Block> {
        self.else_block
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Return {
    value: Option<Expression>,
}

impl Return {
    pub fn value(&self) -> Option<Expression> {
        self.value
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum StatementKind {
    Variable(Variable),
    Assign(Assign),
    Return(Return),
    If(If),
    Loop(Block),
    Compound(Block),
    Expr(Expression),
}

impl StatementKind {
    pub fn expect_variable(&self) -> Variable {
        if let StatementKind::Variable(variable) = self {
            *variable
        } else {
            panic!("expected a variable statement");
        }
    }

    pub fn expect_if(&self) -> &If {
        if let StatementKind::If(stmt) = self {
            stmt
        } else {
            panic!("expected an if statement");
        }
    }

    pub fn expect_return(&self) -> &Return {
        if let StatementKind::Return(stmt) = self {
            stmt
        } else {
            panic!("expected a return statement");
        }
    }

    pub fn expect_expr(&self) -> Expression {
        if let StatementKind::Expr(expr) = self {
            *expr
        } else {
            panic!("expected an expression statement");
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StatementData {
    kind: StatementKind,
}

impl StatementData {
    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }
}

#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct BlockData {
    statements: IndexSet<Statement>,
}

impl BlockData {
    pub fn statements(&self) -> &IndexSet<Statement> {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn add_statement(&mut self, position: BlockPosition, statement: Statement) {
        match position {
            BlockPosition::Append => {
                self.statements.insert(statement);
            }
            BlockPosition::Prepend => {
                // `IndexSet::insert_before` accepts indices in the
                // `0..=set.len()` range, so this works for an empty block.
                self.statements.insert_before(0, statement);
            }
            BlockPosition::InsertAt(index) => {
                self.statements.insert_before(index, statement);
            }
        }
    }
}

pub enum BlockPosition {
    Append,
    Prepend,
    InsertAt(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum ParameterRole {
    UserDefined,
    /// Synthesized by the global-variable rewriter to deliver one bind
    /// group's argument-buffer structure.
    BindGroup,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Parameter {
    pub name: Symbol,
    pub ty: Type,
    pub attributes: AttributeList,
    pub role: ParameterRole,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FunctionData {
    pub name: Symbol,
    pub params: Vec<Parameter>,
    pub ret_ty: Option<Type>,
    pub body: Block,
    /// `Some` for entry-point functions.
    pub stage: Option<ShaderStage>,
}

/// Arena storage for a module's function bodies.
///
/// All AST nodes are addressed by stable slotmap keys; node lists are only
/// mutated through [`Ast`] methods, never while a traversal iterates them.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Ast {
    ty: TypeRegistry,
    expressions: SlotMap<Expression, ExpressionData>,
    statements: SlotMap<Statement, StatementData>,
    blocks: SlotMap<Block, BlockData>,
    variables: SlotMap<Variable, VariableData>,
    functions: SlotMap<Function, FunctionData>,
    function_order: Vec<Function>,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            ty: Default::default(),
            expressions: Default::default(),
            statements: Default::default(),
            blocks: Default::default(),
            variables: Default::default(),
            functions: Default::default(),
            function_order: Vec::new(),
        }
    }

    pub fn ty(&self) -> &TypeRegistry {
        &self.ty
    }

    pub fn ty_mut(&mut self) -> &mut TypeRegistry {
        &mut self.ty
    }

    pub fn add_function(
        &mut self,
        name: Symbol,
        params: Vec<Parameter>,
        ret_ty: Option<Type>,
        stage: Option<ShaderStage>,
    ) -> Function {
        let body = self.blocks.insert(BlockData::default());
        let function = self.functions.insert(FunctionData {
            name,
            params,
            ret_ty,
            body,
            stage,
        });

        self.function_order.push(function);

        function
    }

    pub fn functions(&self) -> impl Iterator<Item = Function> + use<'_> {
        self.function_order.iter().copied()
    }

    pub fn append_parameter(&mut self, function: Function, parameter: Parameter) {
        self.functions[function].params.push(parameter);
    }

    pub fn declare_variable(&mut self, data: VariableData) -> Variable {
        self.variables.insert(data)
    }

    pub fn make_expr_identifier(&mut self, name: Symbol, ty: Type) -> Expression {
        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::Identifier(name),
        })
    }

    pub fn make_expr_field_access(
        &mut self,
        base: Expression,
        field: Symbol,
        ty: Type,
    ) -> Expression {
        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::FieldAccess(FieldAccess { base, field }),
        })
    }

    pub fn make_expr_index_access(
        &mut self,
        base: Expression,
        index: Expression,
        ty: Type,
    ) -> Expression {
        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::IndexAccess(IndexAccess { base, index }),
        })
    }

    pub fn make_expr_call(
        &mut self,
        callee: Function,
        arguments: impl IntoIterator<Item = Expression>,
        ty: Type,
    ) -> Expression {
        let arguments = arguments.into_iter().collect::<Vec<_>>();

        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::Call(Call { callee, arguments }),
        })
    }

    pub fn make_expr_identity(&mut self, inner: Expression, ty: Type) -> Expression {
        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::Identity(inner),
        })
    }

    pub fn make_expr_const_u32(&mut self, value: u32) -> Expression {
        self.expressions.insert(ExpressionData {
            ty: TY_U32,
            kind: ExpressionKind::ConstU32(value),
        })
    }

    pub fn make_expr_const_i32(&mut self, value: i32) -> Expression {
        self.expressions.insert(ExpressionData {
            ty: TY_I32,
            kind: ExpressionKind::ConstI32(value),
        })
    }

    pub fn make_expr_const_f32(&mut self, value: f32) -> Expression {
        self.expressions.insert(ExpressionData {
            ty: TY_F32,
            kind: ExpressionKind::ConstF32(value),
        })
    }

    pub fn make_expr_const_bool(&mut self, value: bool) -> Expression {
        self.expressions.insert(ExpressionData {
            ty: TY_BOOL,
            kind: ExpressionKind::ConstBool(value),
        })
    }

    pub fn make_expr_op_unary(
        &mut self,
        operator: UnaryOperator,
        operand: Expression,
    ) -> Expression {
        let ty = self.expressions[operand].ty;

        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::OpUnary(OpUnary { operator, operand }),
        })
    }

    pub fn make_expr_op_binary(
        &mut self,
        operator: BinaryOperator,
        lhs: Expression,
        rhs: Expression,
    ) -> Expression {
        let ty = self.expressions[lhs].ty;

        self.expressions.insert(ExpressionData {
            ty,
            kind: ExpressionKind::OpBinary(OpBinary { operator, lhs, rhs }),
        })
    }

    /// Replaces the name of an identifier expression in place.
    pub fn rename_identifier(&mut self, expression: Expression, name: Symbol) {
        let ExpressionKind::Identifier(current) = &mut self.expressions[expression].kind else {
            panic!("expected an identifier expression");
        };

        *current = name;
    }

    pub fn append_call_argument(&mut self, call: Expression, argument: Expression) {
        let ExpressionKind::Call(call_data) = &mut self.expressions[call].kind else {
            panic!("expected a call expression");
        };

        call_data.arguments.push(argument);
    }

    pub fn make_stmt_variable(&mut self, variable: Variable) -> Statement {
        self.statements.insert(StatementData {
            kind: StatementKind::Variable(variable),
        })
    }

    pub fn insert_statement(&mut self, block: Block, position: BlockPosition, statement: Statement) {
        self.blocks[block].add_statement(position, statement);
    }

    pub fn add_stmt_variable(
        &mut self,
        block: Block,
        position: BlockPosition,
        variable: Variable,
    ) -> Statement {
        let statement = self.make_stmt_variable(variable);

        self.blocks[block].add_statement(position, statement);

        statement
    }

    pub fn add_stmt_assign(
        &mut self,
        block: Block,
        position: BlockPosition,
        lhs: Expression,
        rhs: Expression,
    ) -> Statement {
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::Assign(Assign { lhs, rhs }),
        });

        self.blocks[block].add_statement(position, statement);

        statement
    }

    pub fn add_stmt_return(
        &mut self,
        block: Block,
        position: BlockPosition,
        value: Option<Expression>,
    ) -> Statement {
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::Return(Return { value }),
        });

        self.blocks[block].add_statement(position, statement);

        statement
    }

    pub fn add_stmt_if(
        &mut self,
        block: Block,
        position: BlockPosition,
        condition: Expression,
    ) -> (Statement, Block) {
        let then_block = self.blocks.insert(BlockData::default());
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::If(If {
                condition,
                then_block,
                else_block: None,
            }),
        });

        self.blocks[block].add_statement(position, statement);

        (statement, then_block)
    }

    pub fn add_else_block(&mut self, if_statement: Statement) -> Block {
        let else_block = self.blocks.insert(BlockData::default());

        let StatementKind::If(stmt) = &mut self.statements[if_statement].kind else {
            panic!("expected an if statement");
        };

        stmt.else_block = Some(else_block);

        else_block
    }

    pub fn add_stmt_loop(&mut self, block: Block, position: BlockPosition) -> (Statement, Block) {
        let loop_block = self.blocks.insert(BlockData::default());
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::Loop(loop_block),
        });

        self.blocks[block].add_statement(position, statement);

        (statement, loop_block)
    }

    pub fn add_stmt_compound(
        &mut self,
        block: Block,
        position: BlockPosition,
    ) -> (Statement, Block) {
        let inner_block = self.blocks.insert(BlockData::default());
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::Compound(inner_block),
        });

        self.blocks[block].add_statement(position, statement);

        (statement, inner_block)
    }

    pub fn add_stmt_expr(
        &mut self,
        block: Block,
        position: BlockPosition,
        expression: Expression,
    ) -> Statement {
        let statement = self.statements.insert(StatementData {
            kind: StatementKind::Expr(expression),
        });

        self.blocks[block].add_statement(position, statement);

        statement
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}

impl Index<Expression> for Ast {
    type Output = ExpressionData;

    fn index(&self, index: Expression) -> &Self::Output {
        &self.expressions[index]
    }
}

impl Index<Statement> for Ast {
    type Output = StatementData;

    fn index(&self, index: Statement) -> &Self::Output {
        &self.statements[index]
    }
}

impl Index<Block> for Ast {
    type Output = BlockData;

    fn index(&self, index: Block) -> &Self::Output {
        &self.blocks[index]
    }
}

impl Index<Variable> for Ast {
    type Output = VariableData;

    fn index(&self, index: Variable) -> &Self::Output {
        &self.variables[index]
    }
}

impl IndexMut<Variable> for Ast {
    fn index_mut(&mut self, index: Variable) -> &mut Self::Output {
        &mut self.variables[index]
    }
}

impl Index<Function> for Ast {
    type Output = FunctionData;

    fn index(&self, index: Function) -> &Self::Output {
        &self.functions[index]
    }
}
