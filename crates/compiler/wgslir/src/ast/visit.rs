use crate::ast::{Ast, Block, Expression, ExpressionKind, Statement, StatementKind};

pub trait TopDownVisitor: Sized {
    fn visit_block(&mut self, ast: &Ast, block: Block) {
        visit_block_top_down(self, ast, block);
    }

    fn visit_statement(&mut self, ast: &Ast, statement: Statement) {
        visit_statement_top_down(self, ast, statement);
    }

    fn visit_expression(&mut self, ast: &Ast, expression: Expression) {
        visit_expression_top_down(self, ast, expression);
    }
}

pub fn visit_block_top_down<V: TopDownVisitor>(visitor: &mut V, ast: &Ast, block: Block) {
    for statement in ast[block].statements() {
        visitor.visit_statement(ast, *statement);
    }
}

pub fn visit_statement_top_down<V: TopDownVisitor>(
    visitor: &mut V,
    ast: &Ast,
    statement: Statement,
) {
    match ast[statement].kind() {
        StatementKind::Variable(variable) => {
            if let Some(initializer) = ast[*variable].initializer {
                visitor.visit_expression(ast, initializer);
            }
        }
        StatementKind::Assign(stmt) => {
            visitor.visit_expression(ast, stmt.lhs());
            visitor.visit_expression(ast, stmt.rhs());
        }
        StatementKind::Return(stmt) => {
            if let Some(value) = stmt.value() {
                visitor.visit_expression(ast, value);
            }
        }
        StatementKind::If(stmt) => {
            visitor.visit_expression(ast, stmt.condition());
            visitor.visit_block(ast, stmt.then_block());

            if let Some(else_block) = stmt.else_block() {
                visitor.visit_block(ast, else_block);
            }
        }
        StatementKind::Loop(block) => {
            visitor.visit_block(ast, *block);
        }
        StatementKind::Compound(block) => {
            visitor.visit_block(ast, *block);
        }
        StatementKind::Expr(expression) => {
            visitor.visit_expression(ast, *expression);
        }
    }
}

pub fn visit_expression_top_down<V: TopDownVisitor>(
    visitor: &mut V,
    ast: &Ast,
    expression: Expression,
) {
    match ast[expression].kind() {
        ExpressionKind::Identifier(_)
        | ExpressionKind::ConstU32(_)
        | ExpressionKind::ConstI32(_)
        | ExpressionKind::ConstF32(_)
        | ExpressionKind::ConstBool(_) => {}
        ExpressionKind::FieldAccess(access) => {
            visitor.visit_expression(ast, access.base());
        }
        ExpressionKind::IndexAccess(access) => {
            visitor.visit_expression(ast, access.base());
            visitor.visit_expression(ast, access.index());
        }
        ExpressionKind::Call(call) => {
            for argument in call.arguments() {
                visitor.visit_expression(ast, *argument);
            }
        }
        ExpressionKind::Identity(inner) => {
            visitor.visit_expression(ast, *inner);
        }
        ExpressionKind::OpUnary(op) => {
            visitor.visit_expression(ast, op.operand());
        }
        ExpressionKind::OpBinary(op) => {
            visitor.visit_expression(ast, op.lhs());
            visitor.visit_expression(ast, op.rhs());
        }
    }
}
