//! AST node definitions.
//!
//! The node graph is a closed tagged union: parents exclusively own their
//! children, and every cross reference (identifier to declaration, base
//! contract to exporting unit, override to base member) is a plain `i64`
//! lookup key, never a second ownership edge. A zero reference means
//! "unresolved", which is a legitimate final state for partially-known
//! multi-contract graphs.

use serde::{Deserialize, Serialize};

use crate::ast::scope::SymbolTable;
use crate::ast::span::SourceSpan;
use crate::ast::types::{contract_description, TypeDescription};

// ============================================================================
// TAGS AND ATTRIBUTE ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    SourceUnit,
    Pragma,
    Import,
    Contract,
    Interface,
    Library,
    BaseContract,
    Function,
    Constructor,
    Fallback,
    Receive,
    Modifier,
    ModifierInvocation,
    Parameter,
    ParameterList,
    StateVariable,
    Struct,
    Enum,
    EnumValue,
    Event,
    Error,
    Using,
    Block,
    UncheckedBlock,
    Return,
    Break,
    Continue,
    If,
    For,
    While,
    Try,
    Catch,
    VariableDeclarationStatement,
    ExpressionStatement,
    Emit,
    Revert,
    Literal,
    Identifier,
    BinaryOperation,
    UnaryOperation,
    FunctionCall,
    NewExpression,
    InlineArray,
    Tuple,
    MemberAccess,
    IndexAccess,
    TypeName,
    Comment,
    LicenseComment,
    Root,
}

impl NodeType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnit => "SourceUnit",
            Self::Pragma => "Pragma",
            Self::Import => "Import",
            Self::Contract => "Contract",
            Self::Interface => "Interface",
            Self::Library => "Library",
            Self::BaseContract => "BaseContract",
            Self::Function => "Function",
            Self::Constructor => "Constructor",
            Self::Fallback => "Fallback",
            Self::Receive => "Receive",
            Self::Modifier => "Modifier",
            Self::ModifierInvocation => "ModifierInvocation",
            Self::Parameter => "Parameter",
            Self::ParameterList => "ParameterList",
            Self::StateVariable => "StateVariable",
            Self::Struct => "Struct",
            Self::Enum => "Enum",
            Self::EnumValue => "EnumValue",
            Self::Event => "Event",
            Self::Error => "Error",
            Self::Using => "Using",
            Self::Block => "Block",
            Self::UncheckedBlock => "UncheckedBlock",
            Self::Return => "Return",
            Self::Break => "Break",
            Self::Continue => "Continue",
            Self::If => "If",
            Self::For => "For",
            Self::While => "While",
            Self::Try => "Try",
            Self::Catch => "Catch",
            Self::VariableDeclarationStatement => "VariableDeclarationStatement",
            Self::ExpressionStatement => "ExpressionStatement",
            Self::Emit => "Emit",
            Self::Revert => "Revert",
            Self::Literal => "Literal",
            Self::Identifier => "Identifier",
            Self::BinaryOperation => "BinaryOperation",
            Self::UnaryOperation => "UnaryOperation",
            Self::FunctionCall => "FunctionCall",
            Self::NewExpression => "NewExpression",
            Self::InlineArray => "InlineArray",
            Self::Tuple => "Tuple",
            Self::MemberAccess => "MemberAccess",
            Self::IndexAccess => "IndexAccess",
            Self::TypeName => "TypeName",
            Self::Comment => "Comment",
            Self::LicenseComment => "LicenseComment",
            Self::Root => "Root",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Payable,
    Pure,
    View,
    Nonpayable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableMutability {
    Mutable,
    Immutable,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    Memory,
    Storage,
    Calldata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

impl ContractKind {
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Contract => NodeType::Contract,
            Self::Interface => NodeType::Interface,
            Self::Library => NodeType::Library,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
}

impl FunctionKind {
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Function => NodeType::Function,
            Self::Constructor => NodeType::Constructor,
            Self::Fallback => NodeType::Fallback,
            Self::Receive => NodeType::Receive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiteralKind {
    String,
    Number,
    Bool,
    HexNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatorCategory {
    Arithmetic,
    Shift,
    Bitwise,
    Logical,
    Equality,
    OrderComparison,
    Assignment,
}

// ============================================================================
// DECLARATION-LIKE LEAVES
// ============================================================================

/// One variable-like declaration: a function parameter, struct member,
/// event/error field, or statement-local variable. Anonymous entries keep an
/// empty name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub type_name: Option<TypeName>,
    pub storage_location: StorageLocation,
    pub visibility: Visibility,
    pub state_mutability: Mutability,
    pub indexed: bool,
    pub scope: i64,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterList {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub parameters: Vec<Parameter>,
}

/// A resolved or pending type reference. Elementary types synthesize their
/// description eagerly; user-defined names carry the declaring node's ID once
/// resolution finds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeName {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub referenced_declaration: i64,
    pub type_description: Option<TypeDescription>,
}

impl TypeName {
    pub fn set_reference_descriptor(
        &mut self,
        declaration: i64,
        description: Option<TypeDescription>,
    ) -> bool {
        self.referenced_declaration = declaration;
        if description.is_some() {
            self.type_description = description;
        }
        true
    }

    fn resolve_pending(&mut self, symbols: &SymbolTable) {
        if self.referenced_declaration == 0 && self.type_description.is_none() {
            if let Some(symbol) = symbols.resolve(&self.name) {
                self.set_reference_descriptor(
                    symbol.id,
                    Some(contract_description(&symbol.name)),
                );
            }
        }
    }

    fn count_unresolved(&self) -> usize {
        usize::from(self.type_description.is_none() && self.referenced_declaration == 0)
    }
}

// ============================================================================
// DIRECTIVES AND CONTRACT MEMBERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pragma {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub file: String,
    pub unit_alias: String,
    pub symbol_aliases: Vec<String>,
    /// ID of the exporting source unit, zero while unresolved.
    pub source_unit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseContract {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub referenced_declaration: i64,
}

impl BaseContract {
    pub fn set_reference_descriptor(
        &mut self,
        declaration: i64,
        _description: Option<TypeDescription>,
    ) -> bool {
        self.referenced_declaration = declaration;
        true
    }

    fn resolve_pending(&mut self, symbols: &SymbolTable) {
        if self.referenced_declaration == 0 {
            if let Some(symbol) = symbols.resolve(&self.name) {
                self.referenced_declaration = symbol.id;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub kind: ContractKind,
    pub is_abstract: bool,
    pub base_contracts: Vec<BaseContract>,
    pub nodes: Vec<Node>,
    pub fully_implemented: bool,
    /// IDs of pragma directives attributed to this contract by the proximity
    /// heuristic.
    pub pragmas: Vec<i64>,
    pub linearized_base_contracts: Vec<i64>,
    pub contract_dependencies: Vec<i64>,
    /// Owning source unit ID.
    pub scope: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVariable {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub type_name: Option<TypeName>,
    pub visibility: Visibility,
    pub mutability: VariableMutability,
    pub storage_location: StorageLocation,
    pub initial_value: Option<Box<Node>>,
    pub type_description: Option<TypeDescription>,
    pub scope: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructDefinition {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub members: Vec<Parameter>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDefinition {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub members: Vec<EnumValue>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub anonymous: bool,
    pub parameters: ParameterList,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDefinition {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub parameters: ParameterList,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsingDirective {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub library_name: String,
    pub referenced_declaration: i64,
    /// None for `using L for *`.
    pub type_name: Option<TypeName>,
}

// ============================================================================
// FUNCTION FAMILY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePath {
    pub name: String,
    pub referenced_declaration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierInvocation {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub referenced_declaration: i64,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub kind: FunctionKind,
    pub name: String,
    pub visibility: Visibility,
    pub state_mutability: Mutability,
    pub is_virtual: bool,
    pub overrides: Vec<OverridePath>,
    pub modifiers: Vec<ModifierInvocation>,
    pub parameters: ParameterList,
    pub return_parameters: ParameterList,
    pub body: Body,
    pub implemented: bool,
    /// Owning contract ID.
    pub scope: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierDefinition {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub is_virtual: bool,
    pub parameters: ParameterList,
    pub body: Body,
    pub implemented: bool,
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// An ordered statement sequence. `node_type` distinguishes plain blocks from
/// unchecked arithmetic regions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub statements: Vec<Node>,
    pub implemented: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IfStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub condition: Box<Node>,
    pub true_body: Box<Node>,
    pub false_body: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub initialiser: Option<Box<Node>>,
    pub condition: Option<Box<Node>>,
    pub loop_expression: Option<Box<Node>>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhileStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub condition: Box<Node>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchClause {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub error_name: String,
    pub parameters: Option<ParameterList>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Box<Node>,
    pub return_parameters: Option<ParameterList>,
    pub body: Body,
    pub clauses: Vec<CatchClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclarationStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub declarations: Vec<Parameter>,
    pub initial_value: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertStatement {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Option<Box<Node>>,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Literal {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub kind: LiteralKind,
    /// Decoded value (escape sequences resolved, quotes stripped).
    pub value: String,
    /// Byte-for-byte hex encoding of the decoded value.
    pub hex_value: String,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub name: String,
    pub referenced_declaration: i64,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryOperation {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub operator: String,
    pub category: OperatorCategory,
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnaryOperation {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub operator: String,
    pub prefix: bool,
    pub sub_expression: Box<Node>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Box<Node>,
    pub arguments: Vec<Node>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpression {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub type_name: TypeName,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineArray {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expressions: Vec<Node>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleExpression {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub components: Vec<Node>,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAccess {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub expression: Box<Node>,
    pub member_name: String,
    pub referenced_declaration: i64,
    pub type_description: Option<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexAccess {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub base: Box<Node>,
    pub index: Option<Box<Node>>,
    pub type_description: Option<TypeDescription>,
}

// ============================================================================
// COMMENTS
// ============================================================================

/// A harvested comment. SPDX license comments get the distinct
/// `LicenseComment` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub text: String,
}

// ============================================================================
// THE NODE UNION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Pragma(Pragma),
    Import(Import),
    Contract(Contract),
    StateVariable(StateVariable),
    Struct(StructDefinition),
    Enum(EnumDefinition),
    Event(EventDefinition),
    ErrorDefinition(ErrorDefinition),
    Using(UsingDirective),
    Function(Function),
    Modifier(ModifierDefinition),
    Body(Body),
    Return(ReturnStatement),
    Break(JumpStatement),
    Continue(JumpStatement),
    If(IfStatement),
    For(ForStatement),
    While(WhileStatement),
    Try(TryStatement),
    VariableDeclaration(VariableDeclarationStatement),
    ExpressionStatement(ExpressionStatement),
    Emit(EmitStatement),
    Revert(RevertStatement),
    Literal(Literal),
    Identifier(Identifier),
    BinaryOperation(BinaryOperation),
    UnaryOperation(UnaryOperation),
    FunctionCall(FunctionCall),
    New(NewExpression),
    InlineArray(InlineArray),
    Tuple(TupleExpression),
    MemberAccess(MemberAccess),
    IndexAccess(IndexAccess),
}

impl Node {
    pub fn id(&self) -> i64 {
        match self {
            Node::Pragma(n) => n.id,
            Node::Import(n) => n.id,
            Node::Contract(n) => n.id,
            Node::StateVariable(n) => n.id,
            Node::Struct(n) => n.id,
            Node::Enum(n) => n.id,
            Node::Event(n) => n.id,
            Node::ErrorDefinition(n) => n.id,
            Node::Using(n) => n.id,
            Node::Function(n) => n.id,
            Node::Modifier(n) => n.id,
            Node::Body(n) => n.id,
            Node::Return(n) => n.id,
            Node::Break(n) => n.id,
            Node::Continue(n) => n.id,
            Node::If(n) => n.id,
            Node::For(n) => n.id,
            Node::While(n) => n.id,
            Node::Try(n) => n.id,
            Node::VariableDeclaration(n) => n.id,
            Node::ExpressionStatement(n) => n.id,
            Node::Emit(n) => n.id,
            Node::Revert(n) => n.id,
            Node::Literal(n) => n.id,
            Node::Identifier(n) => n.id,
            Node::BinaryOperation(n) => n.id,
            Node::UnaryOperation(n) => n.id,
            Node::FunctionCall(n) => n.id,
            Node::New(n) => n.id,
            Node::InlineArray(n) => n.id,
            Node::Tuple(n) => n.id,
            Node::MemberAccess(n) => n.id,
            Node::IndexAccess(n) => n.id,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Pragma(n) => n.node_type,
            Node::Import(n) => n.node_type,
            Node::Contract(n) => n.node_type,
            Node::StateVariable(n) => n.node_type,
            Node::Struct(n) => n.node_type,
            Node::Enum(n) => n.node_type,
            Node::Event(n) => n.node_type,
            Node::ErrorDefinition(n) => n.node_type,
            Node::Using(n) => n.node_type,
            Node::Function(n) => n.node_type,
            Node::Modifier(n) => n.node_type,
            Node::Body(n) => n.node_type,
            Node::Return(n) => n.node_type,
            Node::Break(n) => n.node_type,
            Node::Continue(n) => n.node_type,
            Node::If(n) => n.node_type,
            Node::For(n) => n.node_type,
            Node::While(n) => n.node_type,
            Node::Try(n) => n.node_type,
            Node::VariableDeclaration(n) => n.node_type,
            Node::ExpressionStatement(n) => n.node_type,
            Node::Emit(n) => n.node_type,
            Node::Revert(n) => n.node_type,
            Node::Literal(n) => n.node_type,
            Node::Identifier(n) => n.node_type,
            Node::BinaryOperation(n) => n.node_type,
            Node::UnaryOperation(n) => n.node_type,
            Node::FunctionCall(n) => n.node_type,
            Node::New(n) => n.node_type,
            Node::InlineArray(n) => n.node_type,
            Node::Tuple(n) => n.node_type,
            Node::MemberAccess(n) => n.node_type,
            Node::IndexAccess(n) => n.node_type,
        }
    }

    pub fn src(&self) -> &SourceSpan {
        match self {
            Node::Pragma(n) => &n.src,
            Node::Import(n) => &n.src,
            Node::Contract(n) => &n.src,
            Node::StateVariable(n) => &n.src,
            Node::Struct(n) => &n.src,
            Node::Enum(n) => &n.src,
            Node::Event(n) => &n.src,
            Node::ErrorDefinition(n) => &n.src,
            Node::Using(n) => &n.src,
            Node::Function(n) => &n.src,
            Node::Modifier(n) => &n.src,
            Node::Body(n) => &n.src,
            Node::Return(n) => &n.src,
            Node::Break(n) => &n.src,
            Node::Continue(n) => &n.src,
            Node::If(n) => &n.src,
            Node::For(n) => &n.src,
            Node::While(n) => &n.src,
            Node::Try(n) => &n.src,
            Node::VariableDeclaration(n) => &n.src,
            Node::ExpressionStatement(n) => &n.src,
            Node::Emit(n) => &n.src,
            Node::Revert(n) => &n.src,
            Node::Literal(n) => &n.src,
            Node::Identifier(n) => &n.src,
            Node::BinaryOperation(n) => &n.src,
            Node::UnaryOperation(n) => &n.src,
            Node::FunctionCall(n) => &n.src,
            Node::New(n) => &n.src,
            Node::InlineArray(n) => &n.src,
            Node::Tuple(n) => &n.src,
            Node::MemberAccess(n) => &n.src,
            Node::IndexAccess(n) => &n.src,
        }
    }

    pub fn type_description(&self) -> Option<&TypeDescription> {
        match self {
            Node::StateVariable(n) => n.type_description.as_ref(),
            Node::Struct(n) => n.type_description.as_ref(),
            Node::Enum(n) => n.type_description.as_ref(),
            Node::Event(n) => n.type_description.as_ref(),
            Node::ErrorDefinition(n) => n.type_description.as_ref(),
            Node::Literal(n) => n.type_description.as_ref(),
            Node::Identifier(n) => n.type_description.as_ref(),
            Node::BinaryOperation(n) => n.type_description.as_ref(),
            Node::UnaryOperation(n) => n.type_description.as_ref(),
            Node::FunctionCall(n) => n.type_description.as_ref(),
            Node::New(n) => n.type_description.as_ref(),
            Node::InlineArray(n) => n.type_description.as_ref(),
            Node::Tuple(n) => n.type_description.as_ref(),
            Node::MemberAccess(n) => n.type_description.as_ref(),
            Node::IndexAccess(n) => n.type_description.as_ref(),
            _ => None,
        }
    }

    /// Directly owned subtree nodes, in source order. Typed wrappers
    /// (parameter lists, bodies) contribute their node-valued contents.
    pub fn children(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        match self {
            Node::Pragma(_) | Node::Import(_) | Node::Break(_) | Node::Continue(_) => {}
            Node::Contract(n) => out.extend(n.nodes.iter()),
            Node::StateVariable(n) => {
                if let Some(value) = &n.initial_value {
                    out.push(value.as_ref());
                }
            }
            Node::Struct(_) | Node::Enum(_) | Node::Event(_) | Node::ErrorDefinition(_) => {}
            Node::Using(_) => {}
            Node::Function(n) => {
                for invocation in &n.modifiers {
                    out.extend(invocation.arguments.iter());
                }
                out.extend(n.body.statements.iter());
            }
            Node::Modifier(n) => out.extend(n.body.statements.iter()),
            Node::Body(n) => out.extend(n.statements.iter()),
            Node::Return(n) => {
                if let Some(expr) = &n.expression {
                    out.push(expr.as_ref());
                }
            }
            Node::If(n) => {
                out.push(n.condition.as_ref());
                out.push(n.true_body.as_ref());
                if let Some(body) = &n.false_body {
                    out.push(body.as_ref());
                }
            }
            Node::For(n) => {
                if let Some(init) = &n.initialiser {
                    out.push(init.as_ref());
                }
                if let Some(cond) = &n.condition {
                    out.push(cond.as_ref());
                }
                if let Some(update) = &n.loop_expression {
                    out.push(update.as_ref());
                }
                out.push(n.body.as_ref());
            }
            Node::While(n) => {
                out.push(n.condition.as_ref());
                out.push(n.body.as_ref());
            }
            Node::Try(n) => {
                out.push(n.expression.as_ref());
                out.extend(n.body.statements.iter());
                for clause in &n.clauses {
                    out.extend(clause.body.statements.iter());
                }
            }
            Node::VariableDeclaration(n) => {
                if let Some(value) = &n.initial_value {
                    out.push(value.as_ref());
                }
            }
            Node::ExpressionStatement(n) => out.push(n.expression.as_ref()),
            Node::Emit(n) => out.push(n.expression.as_ref()),
            Node::Revert(n) => {
                if let Some(expr) = &n.expression {
                    out.push(expr.as_ref());
                }
            }
            Node::Literal(_) | Node::Identifier(_) => {}
            Node::BinaryOperation(n) => {
                out.push(n.left.as_ref());
                out.push(n.right.as_ref());
            }
            Node::UnaryOperation(n) => out.push(n.sub_expression.as_ref()),
            Node::FunctionCall(n) => {
                out.push(n.expression.as_ref());
                out.extend(n.arguments.iter());
            }
            Node::New(_) => {}
            Node::InlineArray(n) => out.extend(n.expressions.iter()),
            Node::Tuple(n) => out.extend(n.components.iter()),
            Node::MemberAccess(n) => out.push(n.expression.as_ref()),
            Node::IndexAccess(n) => {
                out.push(n.base.as_ref());
                if let Some(index) = &n.index {
                    out.push(index.as_ref());
                }
            }
        }
        out
    }

    /// Backfills a resolution result on a reference-carrying node. Returns
    /// false for variants that hold no reference.
    pub fn set_reference_descriptor(
        &mut self,
        declaration: i64,
        description: Option<TypeDescription>,
    ) -> bool {
        match self {
            Node::Identifier(n) => {
                n.referenced_declaration = declaration;
                if description.is_some() {
                    n.type_description = description;
                }
                true
            }
            Node::MemberAccess(n) => {
                n.referenced_declaration = declaration;
                if description.is_some() {
                    n.type_description = description;
                }
                true
            }
            _ => false,
        }
    }

    /// Second resolution pass: walk the finished subtree and backfill
    /// references the single pass could not see (cross-file forward
    /// references).
    pub fn resolve_pending(&mut self, symbols: &SymbolTable) {
        match self {
            Node::Contract(n) => {
                for base in &mut n.base_contracts {
                    base.resolve_pending(symbols);
                }
                for child in &mut n.nodes {
                    child.resolve_pending(symbols);
                }
            }
            Node::StateVariable(n) => {
                if let Some(type_name) = &mut n.type_name {
                    type_name.resolve_pending(symbols);
                }
                if let Some(value) = &mut n.initial_value {
                    value.resolve_pending(symbols);
                }
            }
            Node::Struct(n) => resolve_parameters(&mut n.members, symbols),
            Node::Enum(_) => {}
            Node::Event(n) => resolve_parameters(&mut n.parameters.parameters, symbols),
            Node::ErrorDefinition(n) => resolve_parameters(&mut n.parameters.parameters, symbols),
            Node::Using(n) => {
                if n.referenced_declaration == 0 {
                    if let Some(symbol) = symbols.resolve(&n.library_name) {
                        n.referenced_declaration = symbol.id;
                    }
                }
                if let Some(type_name) = &mut n.type_name {
                    type_name.resolve_pending(symbols);
                }
            }
            Node::Function(n) => {
                for path in &mut n.overrides {
                    if path.referenced_declaration == 0 {
                        if let Some(symbol) = symbols.resolve(&path.name) {
                            path.referenced_declaration = symbol.id;
                        }
                    }
                }
                for invocation in &mut n.modifiers {
                    for argument in &mut invocation.arguments {
                        argument.resolve_pending(symbols);
                    }
                }
                resolve_parameters(&mut n.parameters.parameters, symbols);
                resolve_parameters(&mut n.return_parameters.parameters, symbols);
                for statement in &mut n.body.statements {
                    statement.resolve_pending(symbols);
                }
            }
            Node::Modifier(n) => {
                resolve_parameters(&mut n.parameters.parameters, symbols);
                for statement in &mut n.body.statements {
                    statement.resolve_pending(symbols);
                }
            }
            Node::Body(n) => {
                for statement in &mut n.statements {
                    statement.resolve_pending(symbols);
                }
            }
            Node::Return(n) => {
                if let Some(expr) = &mut n.expression {
                    expr.resolve_pending(symbols);
                }
            }
            Node::Break(_) | Node::Continue(_) | Node::Pragma(_) | Node::Import(_) => {}
            Node::If(n) => {
                n.condition.resolve_pending(symbols);
                n.true_body.resolve_pending(symbols);
                if let Some(body) = &mut n.false_body {
                    body.resolve_pending(symbols);
                }
            }
            Node::For(n) => {
                if let Some(init) = &mut n.initialiser {
                    init.resolve_pending(symbols);
                }
                if let Some(cond) = &mut n.condition {
                    cond.resolve_pending(symbols);
                }
                if let Some(update) = &mut n.loop_expression {
                    update.resolve_pending(symbols);
                }
                n.body.resolve_pending(symbols);
            }
            Node::While(n) => {
                n.condition.resolve_pending(symbols);
                n.body.resolve_pending(symbols);
            }
            Node::Try(n) => {
                n.expression.resolve_pending(symbols);
                for statement in &mut n.body.statements {
                    statement.resolve_pending(symbols);
                }
                for clause in &mut n.clauses {
                    for statement in &mut clause.body.statements {
                        statement.resolve_pending(symbols);
                    }
                }
            }
            Node::VariableDeclaration(n) => {
                resolve_parameters(&mut n.declarations, symbols);
                if let Some(value) = &mut n.initial_value {
                    value.resolve_pending(symbols);
                }
            }
            Node::ExpressionStatement(n) => n.expression.resolve_pending(symbols),
            Node::Emit(n) => n.expression.resolve_pending(symbols),
            Node::Revert(n) => {
                if let Some(expr) = &mut n.expression {
                    expr.resolve_pending(symbols);
                }
            }
            Node::Literal(_) => {}
            Node::Identifier(n) => {
                if n.referenced_declaration == 0 {
                    if let Some(symbol) = symbols.resolve(&n.name) {
                        let description = contract_description(&symbol.name);
                        n.referenced_declaration = symbol.id;
                        n.type_description = Some(description);
                    }
                }
            }
            Node::BinaryOperation(n) => {
                n.left.resolve_pending(symbols);
                n.right.resolve_pending(symbols);
            }
            Node::UnaryOperation(n) => n.sub_expression.resolve_pending(symbols),
            Node::FunctionCall(n) => {
                n.expression.resolve_pending(symbols);
                for argument in &mut n.arguments {
                    argument.resolve_pending(symbols);
                }
            }
            Node::New(n) => n.type_name.resolve_pending(symbols),
            Node::InlineArray(n) => {
                for expr in &mut n.expressions {
                    expr.resolve_pending(symbols);
                }
            }
            Node::Tuple(n) => {
                for component in &mut n.components {
                    component.resolve_pending(symbols);
                }
            }
            Node::MemberAccess(n) => n.expression.resolve_pending(symbols),
            Node::IndexAccess(n) => {
                n.base.resolve_pending(symbols);
                if let Some(index) = &mut n.index {
                    index.resolve_pending(symbols);
                }
            }
        }
    }

    /// Number of still-unresolved references in this subtree: identifiers
    /// and base contracts with a zero reference, user-defined type names
    /// with no description.
    pub fn count_unresolved(&self) -> usize {
        let own = match self {
            Node::Identifier(n) => usize::from(n.referenced_declaration == 0),
            Node::Contract(n) => n
                .base_contracts
                .iter()
                .map(|b| usize::from(b.referenced_declaration == 0))
                .sum(),
            Node::StateVariable(n) => n
                .type_name
                .as_ref()
                .map(TypeName::count_unresolved)
                .unwrap_or(0),
            Node::Function(n) => count_unresolved_parameters(&n.parameters.parameters)
                + count_unresolved_parameters(&n.return_parameters.parameters),
            Node::Struct(n) => count_unresolved_parameters(&n.members),
            Node::Event(n) => count_unresolved_parameters(&n.parameters.parameters),
            Node::ErrorDefinition(n) => count_unresolved_parameters(&n.parameters.parameters),
            Node::VariableDeclaration(n) => count_unresolved_parameters(&n.declarations),
            Node::New(n) => n.type_name.count_unresolved(),
            _ => 0,
        };
        own + self
            .children()
            .iter()
            .map(|c| c.count_unresolved())
            .sum::<usize>()
    }
}

fn resolve_parameters(parameters: &mut [Parameter], symbols: &SymbolTable) {
    for parameter in parameters {
        if let Some(type_name) = &mut parameter.type_name {
            type_name.resolve_pending(symbols);
            if parameter.type_description.is_none() {
                parameter.type_description = type_name.type_description.clone();
            }
        }
    }
}

fn count_unresolved_parameters(parameters: &[Parameter]) -> usize {
    parameters
        .iter()
        .map(|p| {
            p.type_name
                .as_ref()
                .map(TypeName::count_unresolved)
                .unwrap_or(0)
        })
        .sum()
}
