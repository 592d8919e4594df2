//! Node constructors and the few mutations allowed after construction.
//!
//! Constructors take fully formed handles and never build children
//! themselves. Leaf constructors cannot fail; constructors that take
//! handles fail only when a handle has already expired.

use super::{Id, Ir, NodeId};
use crate::capability::{AddressRef, AssignableRef, CallableRef, ValueRef};
use crate::error::IrError;
use crate::node::{
    Add, Assignment, Call, CpuRegister, Div, FunctionDefinition, Jump, Label, Loop, MemoryAddress,
    Mul, Scope, Sub, TypeIdentifier, VariableDeclaration,
};

// ─── Leaves ───────────────────────────────────────────────────────

impl Ir {
    /// An empty scope.
    pub fn scope(&mut self) -> Id<Scope> {
        self.alloc_leaf(Scope::new())
    }

    /// A primitive type whose width is not yet resolved.
    pub fn type_identifier(&mut self, name: impl Into<String>) -> Id<TypeIdentifier> {
        self.type_with_width(name, 0)
    }

    pub fn type_with_width(&mut self, name: impl Into<String>, width: u64) -> Id<TypeIdentifier> {
        self.alloc_leaf(TypeIdentifier::new(name.into(), width, Vec::new()))
    }

    pub fn cpu_register(&mut self, name: impl Into<String>) -> Id<CpuRegister> {
        self.alloc_leaf(CpuRegister { name: name.into() })
    }

    pub fn memory_address(&mut self, location: u64) -> Id<MemoryAddress> {
        self.alloc_leaf(MemoryAddress { location })
    }

    pub fn label(&mut self, name: impl Into<String>) -> Id<Label> {
        self.alloc_leaf(Label { name: name.into() })
    }

    /// A function with no parameters and a fresh, empty body.
    pub fn function_definition(&mut self, name: impl Into<String>) -> Id<FunctionDefinition> {
        let body = Id::from_raw(self.alloc(Scope::new().into(), 1));
        self.alloc_leaf(FunctionDefinition {
            name: name.into(),
            parameters: Vec::new(),
            body,
        })
    }
}

// ─── Structural nodes ─────────────────────────────────────────────

impl Ir {
    /// An aggregate type over `components`, in order.
    pub fn composite_type(
        &mut self,
        name: impl Into<String>,
        components: Vec<Id<TypeIdentifier>>,
    ) -> Result<Id<TypeIdentifier>, IrError> {
        self.insert(TypeIdentifier::new(name.into(), 0, components))
    }

    /// Declare `name` of type `ty`, with no location yet.
    pub fn variable_declaration(
        &mut self,
        ty: Id<TypeIdentifier>,
        name: impl Into<String>,
    ) -> Result<Id<VariableDeclaration>, IrError> {
        self.insert(VariableDeclaration {
            name: name.into(),
            ty,
            location: None,
        })
    }

    /// `lhs <- rhs`, holding both sides weakly.
    pub fn assignment(
        &mut self,
        lhs: impl Into<AssignableRef>,
        rhs: impl Into<ValueRef>,
    ) -> Result<Id<Assignment>, IrError> {
        self.insert(Assignment {
            lhs: lhs.into(),
            rhs: rhs.into(),
        })
    }

    /// A loop that takes ownership of `body`.
    pub fn loop_over(&mut self, body: Id<Scope>) -> Result<Id<Loop>, IrError> {
        self.insert(Loop { body })
    }

    pub fn jump(&mut self, label: Id<Label>) -> Result<Id<Jump>, IrError> {
        self.insert(Jump { label })
    }

    pub fn add(
        &mut self,
        result: impl Into<AssignableRef>,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> Result<Id<Add>, IrError> {
        self.insert(Add::new(result.into(), lhs.into(), rhs.into()))
    }

    pub fn sub(
        &mut self,
        result: impl Into<AssignableRef>,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> Result<Id<Sub>, IrError> {
        self.insert(Sub::new(result.into(), lhs.into(), rhs.into()))
    }

    pub fn mul(
        &mut self,
        result: impl Into<AssignableRef>,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> Result<Id<Mul>, IrError> {
        self.insert(Mul::new(result.into(), lhs.into(), rhs.into()))
    }

    pub fn div(
        &mut self,
        result: impl Into<AssignableRef>,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> Result<Id<Div>, IrError> {
        self.insert(Div::new(result.into(), lhs.into(), rhs.into()))
    }

    /// A function over existing parameters and body.
    pub fn function_with(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<Id<VariableDeclaration>>,
        body: Id<Scope>,
    ) -> Result<Id<FunctionDefinition>, IrError> {
        self.insert(FunctionDefinition {
            name: name.into(),
            parameters,
            body,
        })
    }

    pub fn call(
        &mut self,
        callee: impl Into<CallableRef>,
        arguments: Vec<ValueRef>,
    ) -> Result<Id<Call>, IrError> {
        self.insert(Call {
            callee: callee.into(),
            arguments,
        })
    }
}

// ─── Post-construction mutation ───────────────────────────────────

impl Ir {
    /// Append `child` to the end of `scope`; the scope becomes an owner.
    pub fn push_child(&mut self, scope: Id<Scope>, child: impl Into<NodeId>) -> Result<(), IrError> {
        let child = child.into();
        self.check_edge(scope.raw(), child)?;
        self.get_mut(scope)?.children.push(child);
        self.retain(child)
    }

    /// Detach the child at `index`. If the scope was its last owner the
    /// child is freed and the returned handle is already expired.
    pub fn remove_child(&mut self, scope: Id<Scope>, index: usize) -> Result<NodeId, IrError> {
        let children = &mut self.get_mut(scope)?.children;
        if index >= children.len() {
            return Err(IrError::ChildOutOfRange {
                scope: scope.raw(),
                index,
                len: children.len(),
            });
        }
        let child = children.remove(index);
        self.release(child)?;
        Ok(child)
    }

    /// Append a component to an aggregate type.
    pub fn push_component(
        &mut self,
        ty: Id<TypeIdentifier>,
        component: Id<TypeIdentifier>,
    ) -> Result<(), IrError> {
        self.check_edge(ty.raw(), component.raw())?;
        self.get_mut(ty)?.components.push(component);
        self.retain(component.raw())
    }

    /// Record the storage width computed by type resolution.
    pub fn resolve_width(&mut self, ty: Id<TypeIdentifier>, width: u64) -> Result<(), IrError> {
        self.get_mut(ty)?.width = width;
        Ok(())
    }

    pub fn push_parameter(
        &mut self,
        func: Id<FunctionDefinition>,
        parameter: Id<VariableDeclaration>,
    ) -> Result<(), IrError> {
        self.check_edge(func.raw(), parameter.raw())?;
        self.get_mut(func)?.parameters.push(parameter);
        self.retain(parameter.raw())
    }

    /// Assign storage to a declaration, replacing any earlier location.
    pub fn resolve_location(
        &mut self,
        var: Id<VariableDeclaration>,
        location: impl Into<AddressRef>,
    ) -> Result<(), IrError> {
        let location = location.into();
        self.get(var)?;
        self.check_edge(var.raw(), location.id())?;
        self.retain(location.id())?;
        let previous = self.get_mut(var)?.location.replace(location);
        if let Some(previous) = previous {
            self.release(previous.id())?;
        }
        Ok(())
    }

    /// Forget a declaration's location.
    pub fn clear_location(&mut self, var: Id<VariableDeclaration>) -> Result<(), IrError> {
        if let Some(previous) = self.get_mut(var)?.location.take() {
            self.release(previous.id())?;
        }
        Ok(())
    }
}
