//! URN construction and alias collapsing.

use super::options::{Alias, AliasParent};
use super::Resource;
use crate::output::Output;
use crate::settings::DeploymentSettings;

pub const ROOT_STACK_TYPE: &str = "pulumi:pulumi:Stack";
pub const PROVIDER_TYPE_PREFIX: &str = "pulumi:providers:";

/// Builds `urn:pulumi:{stack}::{project}::{qualified type}::{name}`.
///
/// With a parent, the parent's qualified type is prefixed to `resource_type` with a `$`
/// separator. Children of the root stack are not qualified.
pub fn create_urn(
    name: &str,
    resource_type: &str,
    parent_urn: Option<&str>,
    project: &str,
    stack: &str,
) -> String {
    let parent_prefix = parent_urn
        .and_then(|urn| urn.rfind("::").map(|end| &urn[..end]))
        .filter(|prefix| !prefix.ends_with(&format!("::{ROOT_STACK_TYPE}")));
    match parent_prefix {
        Some(prefix) => format!("{prefix}${resource_type}::{name}"),
        None => format!("urn:pulumi:{stack}::{project}::{resource_type}::{name}"),
    }
}

/// Splits a URN into its (unqualified) type and name.
pub fn parse_urn(urn: &str) -> Option<(&str, &str)> {
    let (prefix, name) = urn.rsplit_once("::")?;
    let (_, qualified_type) = prefix.rsplit_once("::")?;
    let resource_type = qualified_type.rsplit('$').next()?;
    Some((resource_type, name))
}

/// The package of a `pkg:module:Type` token, or `None` for malformed tokens.
pub fn package_of(resource_type: &str) -> Option<&str> {
    let mut parts = resource_type.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(package), Some(_), Some(_), None) => Some(package),
        _ => None,
    }
}

/// Turns an alias into the URN the resource used to have.
///
/// Unset alias fields default to the resource's own name and type, the deployment's stack
/// and project, and `parent` (the resource's explicit parent).
pub fn collapse_alias(
    alias: &Alias,
    name: &str,
    resource_type: &str,
    parent: Option<&Resource>,
    settings: &DeploymentSettings,
) -> Output<String> {
    let spec = match alias {
        Alias::Urn(urn) => return Output::create(urn.clone()),
        Alias::Spec(spec) => spec,
    };

    let name = spec.name.clone().unwrap_or_else(|| name.to_string());
    let resource_type = spec
        .resource_type
        .clone()
        .unwrap_or_else(|| resource_type.to_string());
    let stack = spec.stack.clone().unwrap_or_else(|| settings.stack.clone());
    let project = spec
        .project
        .clone()
        .unwrap_or_else(|| settings.project.clone());

    let parent_urn = match &spec.parent {
        AliasParent::Inherit => parent.map(|p| p.urn().clone()),
        AliasParent::NoParent => None,
        AliasParent::Resource(resource) => Some(resource.urn().clone()),
        AliasParent::Urn(urn) => Some(Output::create(urn.clone())),
    };

    match parent_urn {
        Some(parent_urn) => parent_urn.map(move |parent_urn| {
            create_urn(&name, &resource_type, Some(&parent_urn), &project, &stack)
        }),
        None => Output::create(create_urn(&name, &resource_type, None, &project, &stack)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_without_parent() {
        assert_eq!(
            create_urn("w1", "pkg:index:Widget", None, "app", "dev"),
            "urn:pulumi:dev::app::pkg:index:Widget::w1"
        );
    }

    #[test]
    fn urn_with_parent_qualifies_type() {
        let parent = "urn:pulumi:dev::app::pkg:index:Network::net";
        assert_eq!(
            create_urn("w1", "pkg:index:Widget", Some(parent), "app", "dev"),
            "urn:pulumi:dev::app::pkg:index:Network$pkg:index:Widget::w1"
        );
    }

    #[test]
    fn root_stack_children_are_unqualified() {
        let stack = "urn:pulumi:dev::app::pulumi:pulumi:Stack::app-dev";
        assert_eq!(
            create_urn("w1", "pkg:index:Widget", Some(stack), "app", "dev"),
            "urn:pulumi:dev::app::pkg:index:Widget::w1"
        );
    }

    #[test]
    fn parses_qualified_urns() {
        let urn = "urn:pulumi:dev::app::pkg:index:Network$pkg:index:Widget::w1";
        assert_eq!(parse_urn(urn), Some(("pkg:index:Widget", "w1")));
        assert_eq!(parse_urn("not-a-urn"), None);
    }

    #[test]
    fn package_requires_three_parts() {
        assert_eq!(package_of("aws:s3:Bucket"), Some("aws"));
        assert_eq!(package_of("aws:Bucket"), None);
        assert_eq!(package_of("a:b:c:d"), None);
    }
}
