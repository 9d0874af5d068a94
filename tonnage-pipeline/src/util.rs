/// Last path segment of a type name, with generic arguments dropped.
///
/// `"tonnage_pipeline::components::agent_filter::AgentFilter"` becomes
/// `"AgentFilter"`, and `"a::Wrapper<b::Inner>"` becomes `"Wrapper"`.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split_once('<').map_or(full, |(head, _)| head);
    base.rsplit("::").next().unwrap_or(base)
}
