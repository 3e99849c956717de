//! Update declarations and their argument binding.
//!
//! A system declares its update as an ordered list of tokens plus a callback.
//! Tokens are parsed into [`UpdateToken`] when the definition is built and
//! resolved into a fixed [`UpdatePlan`] when the system is activated, so a bad
//! token fails activation instead of a tick. Each tick the plan turns into an
//! [`UpdateArgs`] value per invocation; no token strings are inspected on the
//! per-tick path.

use std::rc::Rc;

use engine_component::Entity;

use crate::error::EcsError;
use crate::module::UpdateFn;
use crate::system::SystemId;
use crate::world::World;

/// A parsed update token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateToken {
    /// `$nodes`: the system's matched-entity collection.
    Nodes,
    /// `$node`: invoke once per matched entity, binding it here.
    Node,
    /// `$time`: the elapsed time passed to [`World::update`].
    Time,
    /// `$world`: the owning world.
    World,
    /// Anything else: a required component or another system's name.
    Name(String),
}

impl UpdateToken {
    /// Parse a token string.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "$nodes" => UpdateToken::Nodes,
            "$node" => UpdateToken::Node,
            "$time" => UpdateToken::Time,
            "$world" => UpdateToken::World,
            other => UpdateToken::Name(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub(crate) struct UpdateSpec {
    pub(crate) tokens: Vec<UpdateToken>,
    pub(crate) callback: UpdateFn,
}

/// A token resolved against a system and the definitions its world can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    Nodes,
    Node,
    Time,
    World,
    Component(Rc<str>),
    System(Rc<str>),
}

/// Binding plan fixed at activation time.
pub(crate) struct UpdatePlan {
    bindings: Vec<Binding>,
    per_node: bool,
    pub(crate) callback: UpdateFn,
}

impl UpdatePlan {
    /// Resolve `spec` for the system `system`.
    ///
    /// A name resolves to a component if the system requires it (which also
    /// needs `$node` in the same declaration), otherwise to a system if
    /// `is_system` accepts it.
    pub(crate) fn resolve(
        system: &str,
        spec: &UpdateSpec,
        require: &[String],
        is_system: impl Fn(&str) -> bool,
    ) -> Result<Self, EcsError> {
        let per_node = spec.tokens.contains(&UpdateToken::Node);
        let unresolved = |token: &str, reason| EcsError::UnresolvedToken {
            system: system.to_string(),
            token: token.to_string(),
            reason,
        };

        let mut bindings = Vec::with_capacity(spec.tokens.len());
        for token in &spec.tokens {
            let binding = match token {
                UpdateToken::Nodes => Binding::Nodes,
                UpdateToken::Node => Binding::Node,
                UpdateToken::Time => Binding::Time,
                UpdateToken::World => Binding::World,
                UpdateToken::Name(name) if require.iter().any(|r| r == name) => {
                    if !per_node {
                        return Err(unresolved(name, "component tokens need $node"));
                    }
                    Binding::Component(Rc::from(name.as_str()))
                }
                UpdateToken::Name(name) if is_system(name) => {
                    Binding::System(Rc::from(name.as_str()))
                }
                UpdateToken::Name(name) => {
                    return Err(unresolved(name, "not a required component or a known system"));
                }
            };
            bindings.push(binding);
        }

        Ok(Self {
            bindings,
            per_node,
            callback: Rc::clone(&spec.callback),
        })
    }

    pub(crate) fn per_node(&self) -> bool {
        self.per_node
    }

    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub(crate) fn bind(
        &self,
        world: &World,
        system: SystemId,
        time: f64,
        node: Option<Entity>,
    ) -> UpdateArgs {
        let values = self
            .bindings
            .iter()
            .filter_map(|binding| {
                Some(match binding {
                    Binding::Nodes => Arg::Nodes(system),
                    Binding::Node => Arg::Node(node?),
                    Binding::Time => Arg::Time(time),
                    Binding::World => Arg::World,
                    Binding::Component(name) => Arg::Component {
                        entity: node?,
                        name: Rc::clone(name),
                    },
                    Binding::System(name) => Arg::System {
                        name: Rc::clone(name),
                        id: world.system_id(name),
                    },
                })
            })
            .collect();
        UpdateArgs { system, values }
    }
}

/// One bound update argument.
///
/// Arguments that refer to world-owned data carry handles; the callback reads
/// or mutates the data through the `&mut World` it receives alongside.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `$nodes`: read them with `world.system(id)?.nodes()`.
    Nodes(SystemId),
    /// `$node`: the entity this invocation is for.
    Node(Entity),
    /// `$time`.
    Time(f64),
    /// `$world`: the world passed to the callback.
    World,
    /// A required component on the current entity.
    Component { entity: Entity, name: Rc<str> },
    /// Another system, with its live instance if it is active.
    System { name: Rc<str>, id: Option<SystemId> },
}

/// Arguments for one update invocation, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateArgs {
    system: SystemId,
    values: Vec<Arg>,
}

impl UpdateArgs {
    /// The system being updated.
    #[must_use]
    pub fn system(&self) -> SystemId {
        self.system
    }

    /// All bound arguments.
    #[must_use]
    pub fn values(&self) -> &[Arg] {
        &self.values
    }

    /// The argument at position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.values.get(index)
    }

    /// The bound `$time`, if declared.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.values.iter().find_map(|a| match a {
            Arg::Time(t) => Some(*t),
            _ => None,
        })
    }

    /// The bound `$node`, if declared.
    #[must_use]
    pub fn node(&self) -> Option<Entity> {
        self.values.iter().find_map(|a| match a {
            Arg::Node(e) => Some(*e),
            _ => None,
        })
    }

    /// The bound other-system handle for `name`, if declared and active.
    #[must_use]
    pub fn other_system(&self, name: &str) -> Option<SystemId> {
        self.values.iter().find_map(|a| match a {
            Arg::System { name: bound, id } if bound.as_ref() == name => *id,
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tokens: &[&str]) -> UpdateSpec {
        UpdateSpec {
            tokens: tokens.iter().map(|t| UpdateToken::parse(t)).collect(),
            callback: Rc::new(|_: &mut World, _: &UpdateArgs| -> anyhow::Result<()> { Ok(()) }),
        }
    }

    fn no_systems(_: &str) -> bool {
        false
    }

    #[test]
    fn test_parse_reserved_tokens() {
        assert_eq!(UpdateToken::parse("$nodes"), UpdateToken::Nodes);
        assert_eq!(UpdateToken::parse("$node"), UpdateToken::Node);
        assert_eq!(UpdateToken::parse("$time"), UpdateToken::Time);
        assert_eq!(UpdateToken::parse("$world"), UpdateToken::World);
        assert_eq!(
            UpdateToken::parse("position"),
            UpdateToken::Name("position".into())
        );
    }

    #[test]
    fn test_resolve_plan_without_node_runs_once() {
        let plan =
            UpdatePlan::resolve("s", &spec(&["$nodes", "$time"]), &[], no_systems).unwrap();
        assert!(!plan.per_node());
        assert_eq!(plan.bindings(), [Binding::Nodes, Binding::Time]);
    }

    #[test]
    fn test_resolve_component_with_node() {
        let require = vec!["position".to_string()];
        let plan =
            UpdatePlan::resolve("s", &spec(&["$node", "position"]), &require, no_systems).unwrap();
        assert!(plan.per_node());
        assert_eq!(
            plan.bindings(),
            [Binding::Node, Binding::Component(Rc::from("position"))]
        );
    }

    #[test]
    fn test_component_without_node_is_rejected() {
        let require = vec!["position".to_string()];
        let err = UpdatePlan::resolve("s", &spec(&["position"]), &require, no_systems)
            .err()
            .unwrap();
        assert!(matches!(err, EcsError::UnresolvedToken { .. }));
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = UpdatePlan::resolve("s", &spec(&["$time", "mystery"]), &[], no_systems)
            .err()
            .unwrap();
        match err {
            EcsError::UnresolvedToken { system, token, .. } => {
                assert_eq!(system, "s");
                assert_eq!(token, "mystery");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_system_name_resolves() {
        let plan =
            UpdatePlan::resolve("s", &spec(&["physics"]), &[], |name| name == "physics").unwrap();
        assert_eq!(plan.bindings(), [Binding::System(Rc::from("physics"))]);
    }
}
