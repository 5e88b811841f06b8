//! Namespace merging and validation.
//!
//! The resolver merges all parsed files into one case-sensitive namespace,
//! resolves group membership into a DAG, flattens property inheritance,
//! constant-folds declared ranges and cost tables, and checks every
//! identifier reference. Resolution never partially succeeds: any diagnostic
//! voids the whole load and the full list is reported.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::ast::{
    self, AuthorizeClause, AwardSource, DistributionEntryKind, Expression, Ident, Item,
    ParamConstraint, SetSource, SourceFile, Statement, Trigger,
};
use crate::eval::{Bindings, Evaluator, Value};

use super::ResolutionError;
use super::program::{
    Authorize, CollectableGroup, CollectableType, Constraint, CostTier, Distribution,
    DistributionEntry, EntryTarget, EventDefinition, EventParam, GroupMember, Property,
    RemoteEvent, ResolvedProgram,
};

/// Resolves parsed source files into a [`ResolvedProgram`].
#[derive(Debug, Default)]
pub struct Resolver {
    evaluator: Evaluator,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(files = files.len()))]
    pub fn resolve(
        &self,
        files: Vec<SourceFile>,
    ) -> Result<ResolvedProgram, Vec<ResolutionError>> {
        let mut ctx = Context::default();

        for file in &files {
            for item in &file.items {
                ctx.collect(item);
            }
        }

        self.resolve_groups(&mut ctx);
        self.resolve_collectables(&mut ctx);
        self.resolve_distributions(&mut ctx);
        self.resolve_events(&mut ctx);

        if ctx.diagnostics.is_empty() {
            debug!(
                collectables = ctx.program.collectables.len(),
                groups = ctx.program.groups.len(),
                distributions = ctx.program.distributions.len(),
                events = ctx.program.events.len(),
                "program resolved"
            );
            Ok(ctx.program)
        } else {
            Err(ctx.diagnostics)
        }
    }

    /// Builds the group DAG: member edges, cycle detection, leaf flattening.
    fn resolve_groups(&self, ctx: &mut Context) {
        let group_defs: Vec<_> = ctx.groups.values().cloned().collect();
        let collectable_defs: Vec<_> = ctx.collectables.values().cloned().collect();

        // member lists: declared members plus `in Group` attachments
        let mut members: BTreeMap<String, Vec<GroupMember>> = BTreeMap::new();
        for def in &group_defs {
            let mut list = Vec::new();
            for member in &def.members {
                if ctx.collectables.contains_key(&member.name) {
                    list.push(GroupMember::Type(member.name.clone()));
                } else if ctx.groups.contains_key(&member.name) {
                    list.push(GroupMember::Group(member.name.clone()));
                } else {
                    ctx.diagnostics.push(ResolutionError::undefined(
                        &member.name,
                        format!("group '{}'", def.name.name),
                        member,
                    ));
                }
            }
            members.insert(def.name.name.clone(), list);
        }
        for def in &collectable_defs {
            if let Some(group) = &def.group {
                match members.get_mut(&group.name) {
                    Some(list) => {
                        let entry = GroupMember::Type(def.name.name.clone());
                        if !list.contains(&entry) {
                            list.push(entry);
                        }
                    }
                    None => ctx.diagnostics.push(ResolutionError::undefined(
                        &group.name,
                        format!("collectable '{}'", def.name.name),
                        group,
                    )),
                }
            }
        }

        // cycle check over group-to-group edges
        let mut state: HashMap<String, VisitState> = HashMap::new();
        for name in members.keys() {
            if !matches!(state.get(name), Some(VisitState::Done)) {
                detect_cycle(name, &members, &mut state, &mut ctx.diagnostics);
            }
        }
        if ctx
            .diagnostics
            .iter()
            .any(|d| matches!(d, ResolutionError::CyclicGroup { .. }))
        {
            // leaf flattening below assumes an acyclic graph
            return;
        }

        // flatten leaves and build resolved groups
        let mut leaf_cache: HashMap<String, Vec<String>> = HashMap::new();
        for def in &group_defs {
            let name = &def.name.name;
            let leaves = flatten_leaves(name, &members, &mut leaf_cache);
            let mut properties = BTreeMap::new();
            for prop in &def.properties {
                if properties
                    .insert(prop.id.name.clone(), resolved_property(prop))
                    .is_some()
                {
                    ctx.diagnostics.push(ResolutionError::duplicate(
                        &prop.id.name,
                        "property",
                        &prop.id,
                    ));
                }
            }
            ctx.program.groups.insert(
                name.clone(),
                CollectableGroup {
                    name: name.clone(),
                    members: members.get(name).cloned().unwrap_or_default(),
                    properties,
                    leaf_types: leaves,
                },
            );
        }

        // validate group property defaults against the group's own scope
        for def in &group_defs {
            let scope: BTreeSet<String> = group_scope(&def.name.name, &ctx.program);
            for prop in &def.properties {
                if let Some(default) = &prop.default {
                    self.check_free_identifiers(
                        default,
                        &scope,
                        format!(
                            "property '{}' of group '{}'",
                            prop.id.name, def.name.name
                        ),
                        &def.name,
                        &mut ctx.diagnostics,
                    );
                }
            }
        }
    }

    /// Flattens property inheritance and validates cost tables.
    fn resolve_collectables(&self, ctx: &mut Context) {
        // reverse edges: which groups directly contain a type or a group
        let mut type_containers: HashMap<String, Vec<String>> = HashMap::new();
        let mut group_containers: HashMap<String, Vec<String>> = HashMap::new();
        for (group_name, group) in &ctx.program.groups {
            for member in &group.members {
                match member {
                    GroupMember::Type(name) => type_containers
                        .entry(name.clone())
                        .or_default()
                        .push(group_name.clone()),
                    GroupMember::Group(name) => group_containers
                        .entry(name.clone())
                        .or_default()
                        .push(group_name.clone()),
                }
            }
        }

        let defs: Vec<_> = ctx.collectables.values().cloned().collect();
        for def in defs {
            let name = def.name.name.clone();
            let mut properties: BTreeMap<String, Property> = BTreeMap::new();
            let mut own_ids = HashSet::new();
            for prop in &def.properties {
                if !own_ids.insert(prop.id.name.clone()) {
                    ctx.diagnostics.push(ResolutionError::duplicate(
                        &prop.id.name,
                        "property",
                        &prop.id,
                    ));
                }
                properties.insert(prop.id.name.clone(), resolved_property(prop));
            }

            // walk all ancestor groups; an id declared by two different
            // ancestors conflicts unless the type overrides it
            let mut inherited_from: HashMap<String, String> = HashMap::new();
            let mut queue: Vec<String> =
                type_containers.get(&name).cloned().unwrap_or_default();
            let mut seen: HashSet<String> = queue.iter().cloned().collect();
            while let Some(group_name) = queue.pop() {
                if let Some(group) = ctx.program.groups.get(&group_name) {
                    for (id, prop) in &group.properties {
                        if own_ids.contains(id) {
                            continue; // explicit override
                        }
                        match inherited_from.get(id) {
                            Some(previous) if previous != &group_name => {
                                ctx.diagnostics.push(ResolutionError::duplicate(
                                    id,
                                    "inherited property",
                                    &def.name,
                                ));
                            }
                            Some(_) => {}
                            None => {
                                inherited_from.insert(id.clone(), group_name.clone());
                                properties.insert(id.clone(), prop.clone());
                            }
                        }
                    }
                }
                for parent in group_containers
                    .get(&group_name)
                    .cloned()
                    .unwrap_or_default()
                {
                    if seen.insert(parent.clone()) {
                        queue.push(parent);
                    }
                }
            }

            // property defaults see `amount` and the full property set
            let mut scope: BTreeSet<String> = properties.keys().cloned().collect();
            scope.insert("amount".to_string());
            for prop in &def.properties {
                if let Some(default) = &prop.default {
                    self.check_free_identifiers(
                        default,
                        &scope,
                        format!("property '{}' of '{}'", prop.id.name, name),
                        &def.name,
                        &mut ctx.diagnostics,
                    );
                }
            }

            let upgrades = self.resolve_cost_table(&name, "upgrades", &def.upgrades, ctx);
            let redemptions =
                self.resolve_cost_table(&name, "redemptions", &def.redemptions, ctx);

            let groups = type_containers.get(&name).cloned().unwrap_or_default();
            ctx.program.collectables.insert(
                name.clone(),
                CollectableType {
                    name,
                    groups,
                    amount_bearing: def.amount_bearing,
                    properties,
                    upgrades,
                    redemptions,
                },
            );
        }
    }

    /// Validates one upgrade/redemption table: constant bounds, ordered
    /// non-overlapping tiers, and a monotonically non-decreasing cost.
    fn resolve_cost_table(
        &self,
        owner: &str,
        table: &str,
        tiers: &[ast::RuleTier],
        ctx: &mut Context,
    ) -> Vec<CostTier> {
        let mut resolved = Vec::new();
        let mut previous_hi: Option<i64> = None;
        let mut previous_cost: Option<f64> = None;
        for tier in tiers {
            if !ctx.collectables.contains_key(&tier.collectable.name) {
                ctx.diagnostics.push(ResolutionError::undefined(
                    &tier.collectable.name,
                    format!("{} of '{}'", table, owner),
                    &tier.collectable,
                ));
                continue;
            }
            let lo = match self.const_integer(&tier.amount_lo) {
                Ok(v) => v,
                Err(message) => {
                    ctx.diagnostics.push(ResolutionError::CostTable {
                        name: owner.to_string(),
                        message: format!("{}: tier lower bound {}", table, message),
                    });
                    continue;
                }
            };
            let hi = match self.const_integer(&tier.amount_hi) {
                Ok(v) => v,
                Err(message) => {
                    ctx.diagnostics.push(ResolutionError::CostTable {
                        name: owner.to_string(),
                        message: format!("{}: tier upper bound {}", table, message),
                    });
                    continue;
                }
            };
            if lo > hi {
                ctx.diagnostics.push(ResolutionError::CostTable {
                    name: owner.to_string(),
                    message: format!("{}: tier range {} to {} is inverted", table, lo, hi),
                });
                continue;
            }
            if let Some(previous) = previous_hi {
                if lo <= previous {
                    ctx.diagnostics.push(ResolutionError::CostTable {
                        name: owner.to_string(),
                        message: format!(
                            "{}: tier starting at {} overlaps the previous tier",
                            table, lo
                        ),
                    });
                }
            }
            previous_hi = Some(hi);

            // each tier cost must be derivable with the tier's amount bound,
            // and costs never decrease as amount increases
            let cost_at = |amount: i64| -> Result<f64, String> {
                let env = Bindings::new().with("amount", Value::Integer(amount));
                let value = self
                    .evaluator
                    .evaluate_const(&tier.cost, &env)
                    .map_err(|e| e.to_string())?;
                value
                    .as_f64()
                    .ok_or_else(|| format!("cost is not numeric ({})", value.kind()))
            };
            match (cost_at(lo), cost_at(hi)) {
                (Ok(cost_lo), Ok(cost_hi)) => {
                    if cost_hi < cost_lo
                        || previous_cost.map(|p| cost_lo < p).unwrap_or(false)
                    {
                        ctx.diagnostics.push(ResolutionError::CostTable {
                            name: owner.to_string(),
                            message: format!(
                                "{}: cost decreases as amount increases at tier {} to {}",
                                table, lo, hi
                            ),
                        });
                    }
                    previous_cost = Some(cost_hi);
                }
                (Err(message), _) | (_, Err(message)) => {
                    ctx.diagnostics.push(ResolutionError::CostTable {
                        name: owner.to_string(),
                        message: format!("{}: {}", table, message),
                    });
                }
            }

            resolved.push(CostTier {
                amount_lo: lo,
                amount_hi: hi,
                collectable: tier.collectable.name.clone(),
                cost: tier.cost.clone(),
            });
        }
        resolved
    }

    fn resolve_distributions(&self, ctx: &mut Context) {
        let defs: Vec<_> = ctx.distributions.values().cloned().collect();
        for def in defs {
            let name = def.name.name.clone();
            let push = |message: String, ctx: &mut Context| {
                ctx.diagnostics.push(ResolutionError::DistributionConfig {
                    name: name.clone(),
                    message,
                });
            };

            let amount_range = self.const_range(&def.amount_range);
            let group_range = self.const_range(&def.group_range);
            let (amount_range, group_range) = match (amount_range, group_range) {
                (Ok(a), Ok(g)) => (a, g),
                (Err(message), _) | (_, Err(message)) => {
                    push(format!("declared range {}", message), ctx);
                    continue;
                }
            };
            if amount_range.0 > amount_range.1 {
                push(
                    format!(
                        "amount range {} to {} is inverted",
                        amount_range.0, amount_range.1
                    ),
                    ctx,
                );
            }
            if group_range.0 > group_range.1 {
                push(
                    format!(
                        "group range {} to {} is inverted",
                        group_range.0, group_range.1
                    ),
                    ctx,
                );
            }
            if group_range.0 < 0 {
                push("group range must be non-negative".to_string(), ctx);
            }
            if def.entries.is_empty() {
                push("no entries declared".to_string(), ctx);
            }

            // first pass over entries: targets, declared weights, caps
            let mut entries: Vec<(EntryTarget, Option<f64>, Option<u32>)> = Vec::new();
            for entry in &def.entries {
                let target = if ctx.collectables.contains_key(&entry.target.name) {
                    EntryTarget::Type(entry.target.name.clone())
                } else if ctx.groups.contains_key(&entry.target.name) {
                    EntryTarget::Group(entry.target.name.clone())
                } else {
                    ctx.diagnostics.push(ResolutionError::undefined(
                        &entry.target.name,
                        format!("distribution '{}'", def.name.name),
                        &entry.target,
                    ));
                    continue;
                };
                match &entry.kind {
                    DistributionEntryKind::Weight(expr) => {
                        match self.const_weight(expr) {
                            Ok(weight) if weight >= 0.0 => {
                                entries.push((target, Some(weight), None))
                            }
                            Ok(_) => push("negative weight".to_string(), ctx),
                            Err(message) => push(format!("weight {}", message), ctx),
                        }
                    }
                    DistributionEntryKind::Max(expr)
                    | DistributionEntryKind::Fixed(expr) => match self.const_integer(expr) {
                        Ok(cap) if cap >= 1 => {
                            entries.push((target, None, Some(cap as u32)))
                        }
                        Ok(cap) => push(format!("cap {} must be at least 1", cap), ctx),
                        Err(message) => push(format!("cap {}", message), ctx),
                    },
                }
            }

            // capped entries without weights share the mean declared weight
            let declared: Vec<f64> = entries.iter().filter_map(|(_, w, _)| *w).collect();
            let implied = if declared.is_empty() {
                1.0
            } else {
                declared.iter().sum::<f64>() / declared.len() as f64
            };
            let resolved: Vec<DistributionEntry> = entries
                .into_iter()
                .map(|(target, weight, cap)| DistributionEntry {
                    target,
                    weight: weight.unwrap_or(implied),
                    cap,
                })
                .collect();
            if !resolved.is_empty() && resolved.iter().map(|e| e.weight).sum::<f64>() <= 0.0 {
                push("all declared weights are zero".to_string(), ctx);
            }

            ctx.program.distributions.insert(
                def.name.name.clone(),
                Distribution {
                    name: def.name.name.clone(),
                    amount_range,
                    group_range,
                    entries: resolved,
                },
            );
        }
    }

    fn resolve_events(&self, ctx: &mut Context) {
        let remote_defs: Vec<_> = ctx.remote_events.values().cloned().collect();
        for def in remote_defs {
            let params = self.resolve_params(&def.name, &def.params, ctx);
            ctx.program.remote_events.insert(
                def.name.name.clone(),
                RemoteEvent {
                    name: def.name.name.clone(),
                    params,
                },
            );
        }

        let defs: Vec<_> = ctx.events.values().cloned().collect();
        for def in defs {
            let params = self.resolve_params(&def.name, &def.params, ctx);
            let authorize = def
                .authorize
                .as_ref()
                .and_then(|clause| self.resolve_authorize(&def.name, clause, &params, ctx));

            let mut scope: BTreeSet<String> =
                params.iter().map(|p| p.name.clone()).collect();
            self.check_statements(&def.body, &mut scope, &def.name, ctx);

            ctx.program.events.insert(
                def.name.name.clone(),
                EventDefinition {
                    name: def.name.name.clone(),
                    params,
                    authorize,
                    body: def.body.clone(),
                },
            );
        }
    }

    fn resolve_params(
        &self,
        event: &Ident,
        params: &[ast::ParamDef],
        ctx: &mut Context,
    ) -> Vec<EventParam> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for param in params {
            if !seen.insert(param.name.name.clone()) {
                ctx.diagnostics.push(ResolutionError::duplicate(
                    &param.name.name,
                    "parameter",
                    &param.name,
                ));
            }
            let constraint = match &param.constraint {
                ParamConstraint::Entity(target) => {
                    if ctx.collectables.contains_key(&target.name) {
                        Constraint::CollectableType(target.name.clone())
                    } else if ctx.groups.contains_key(&target.name) {
                        Constraint::Group(target.name.clone())
                    } else {
                        ctx.diagnostics.push(ResolutionError::undefined(
                            &target.name,
                            format!("parameter '{}' of '{}'", param.name.name, event.name),
                            target,
                        ));
                        continue;
                    }
                }
                ParamConstraint::User => Constraint::User,
                ParamConstraint::Integer => Constraint::Integer,
                ParamConstraint::Decimal => Constraint::Decimal,
                ParamConstraint::Text => Constraint::Text,
            };
            resolved.push(EventParam {
                name: param.name.name.clone(),
                constraint,
                guard: param.guard.clone(),
            });
        }
        // guards may reference any parameter
        let scope: BTreeSet<String> = resolved.iter().map(|p| p.name.clone()).collect();
        for param in params {
            if let Some(guard) = &param.guard {
                self.check_free_identifiers(
                    guard,
                    &scope,
                    format!("guard of parameter '{}'", param.name.name),
                    event,
                    &mut ctx.diagnostics,
                );
            }
        }
        resolved
    }

    /// Classifies an authorize clause: a role, any authenticated user, or a
    /// `<param>.owner` path.
    fn resolve_authorize(
        &self,
        event: &Ident,
        clause: &AuthorizeClause,
        params: &[EventParam],
        ctx: &mut Context,
    ) -> Option<Authorize> {
        match clause.path.as_slice() {
            [single] => match single.name.as_str() {
                "gameserver" | "admin" => Some(Authorize::Role(single.name.clone())),
                "user" => Some(Authorize::AnyUser),
                other => {
                    ctx.diagnostics.push(ResolutionError::undefined(
                        other,
                        format!("authorize clause of '{}'", event.name),
                        single,
                    ));
                    None
                }
            },
            [param, owner] if owner.name == "owner" => {
                let is_entity_param = params.iter().any(|p| {
                    p.name == param.name
                        && matches!(
                            p.constraint,
                            Constraint::CollectableType(_) | Constraint::Group(_)
                        )
                });
                if is_entity_param {
                    Some(Authorize::ParamOwner {
                        param: param.name.clone(),
                    })
                } else {
                    ctx.diagnostics.push(ResolutionError::undefined(
                        &param.name,
                        format!("authorize clause of '{}'", event.name),
                        param,
                    ));
                    None
                }
            }
            other => {
                let path: Vec<&str> = other.iter().map(|i| i.name.as_str()).collect();
                ctx.diagnostics.push(ResolutionError::undefined(
                    &path.join("."),
                    format!("authorize clause of '{}'", event.name),
                    &clause.path[0],
                ));
                None
            }
        }
    }

    fn check_statements(
        &self,
        statements: &[Statement],
        scope: &mut BTreeSet<String>,
        event: &Ident,
        ctx: &mut Context,
    ) {
        for statement in statements {
            match statement {
                Statement::Assert(expr) => {
                    self.check_scoped(expr, scope, "assert", event, ctx);
                }
                Statement::Set { var, source } => {
                    match source {
                        SetSource::Expr(expr) => {
                            self.check_scoped(expr, scope, "set", event, ctx)
                        }
                        SetSource::Find(query) => {
                            // the subject names a host entity kind and is not
                            // resolved against the program namespace
                            if let Some(predicate) = &query.predicate {
                                self.check_scoped(predicate, scope, "find", event, ctx);
                            }
                        }
                    }
                    scope.insert(var.name.clone());
                }
                Statement::Award { source, target } => {
                    match source {
                        AwardSource::Amount { amount, collectable } => {
                            if !ctx.collectables.contains_key(&collectable.name) {
                                ctx.diagnostics.push(ResolutionError::undefined(
                                    &collectable.name,
                                    format!("award in '{}'", event.name),
                                    collectable,
                                ));
                            }
                            self.check_scoped(amount, scope, "award", event, ctx);
                        }
                        AwardSource::Distribution(dist) => {
                            if !ctx.distributions.contains_key(&dist.name) {
                                ctx.diagnostics.push(ResolutionError::undefined(
                                    &dist.name,
                                    format!("award in '{}'", event.name),
                                    dist,
                                ));
                            }
                        }
                    }
                    self.check_scoped(target, scope, "award target", event, ctx);
                }
                Statement::Notify {
                    target,
                    event: notify_event,
                    args,
                } => {
                    if !ctx.remote_events.contains_key(&notify_event.name) {
                        ctx.diagnostics.push(ResolutionError::undefined(
                            &notify_event.name,
                            format!("notify in '{}'", event.name),
                            notify_event,
                        ));
                    }
                    self.check_scoped(target, scope, "notify target", event, ctx);
                    for arg in args {
                        self.check_scoped(arg, scope, "notify argument", event, ctx);
                    }
                }
                Statement::Option { branches } => {
                    for branch in branches {
                        let mut branch_scope = scope.clone();
                        for trigger in &branch.triggers {
                            match trigger {
                                Trigger::Timer(expr) => self.check_scoped(
                                    expr,
                                    &branch_scope,
                                    "timer",
                                    event,
                                    ctx,
                                ),
                                Trigger::Cost { amount, collectable } => {
                                    if !ctx.collectables.contains_key(&collectable.name) {
                                        ctx.diagnostics.push(ResolutionError::undefined(
                                            &collectable.name,
                                            format!("cost in '{}'", event.name),
                                            collectable,
                                        ));
                                    }
                                    self.check_scoped(
                                        amount,
                                        &branch_scope,
                                        "cost",
                                        event,
                                        ctx,
                                    );
                                }
                                Trigger::Assert(expr) => self.check_scoped(
                                    expr,
                                    &branch_scope,
                                    "assert",
                                    event,
                                    ctx,
                                ),
                            }
                        }
                        self.check_statements(&branch.body, &mut branch_scope, event, ctx);
                    }
                }
            }
        }
    }

    fn check_scoped(
        &self,
        expr: &Expression,
        scope: &BTreeSet<String>,
        context: &str,
        event: &Ident,
        ctx: &mut Context,
    ) {
        self.check_free_identifiers(
            expr,
            scope,
            format!("{} in '{}'", context, event.name),
            event,
            &mut ctx.diagnostics,
        );
    }

    fn check_free_identifiers(
        &self,
        expr: &Expression,
        scope: &BTreeSet<String>,
        context: String,
        anchor: &Ident,
        diagnostics: &mut Vec<ResolutionError>,
    ) {
        let mut free = BTreeSet::new();
        free_identifiers(expr, &mut free);
        for name in free {
            if !scope.contains(&name) {
                diagnostics.push(ResolutionError::UndefinedReference {
                    name,
                    context: context.clone(),
                    line: anchor.line,
                    column: anchor.column,
                });
            }
        }
    }

    fn const_integer(&self, expr: &Expression) -> Result<i64, String> {
        match self
            .evaluator
            .evaluate_const(expr, &Bindings::new())
            .map_err(|e| e.to_string())?
        {
            Value::Integer(i) => Ok(i),
            other => Err(format!("must be a constant integer, got {}", other.kind())),
        }
    }

    fn const_range(&self, range: &(Expression, Expression)) -> Result<(i64, i64), String> {
        Ok((self.const_integer(&range.0)?, self.const_integer(&range.1)?))
    }

    /// A weight is a percent literal's fraction, or a plain number taken at
    /// face value.
    fn const_weight(&self, expr: &Expression) -> Result<f64, String> {
        match self
            .evaluator
            .evaluate_const(expr, &Bindings::new())
            .map_err(|e| e.to_string())?
        {
            Value::Percent(p) => Ok(p),
            Value::Integer(i) => Ok(i as f64),
            Value::Decimal(d) => Ok(d),
            other => Err(format!("must be a constant number, got {}", other.kind())),
        }
    }
}

/// Working state of one resolution run.
#[derive(Debug, Default)]
struct Context {
    collectables: BTreeMap<String, ast::CollectableDef>,
    groups: BTreeMap<String, ast::GroupDef>,
    distributions: BTreeMap<String, ast::DistributionDef>,
    remote_events: BTreeMap<String, ast::RemoteEventDef>,
    events: BTreeMap<String, ast::EventDef>,
    names: HashMap<String, &'static str>,
    diagnostics: Vec<ResolutionError>,
    program: ResolvedProgram,
}

impl Context {
    /// Registers a top-level item into the single namespace; redeclaration
    /// of an identifier is fatal regardless of item kind.
    fn collect(&mut self, item: &Item) {
        match item {
            Item::Include(decl) => {
                debug!(path = %decl.path, "include directive left to the loader");
            }
            Item::Collectable(def) => {
                if self.register(&def.name, "collectable") {
                    self.collectables.insert(def.name.name.clone(), def.clone());
                }
            }
            Item::Group(def) => {
                if self.register(&def.name, "group") {
                    self.groups.insert(def.name.name.clone(), def.clone());
                }
            }
            Item::Distribution(def) => {
                if self.register(&def.name, "distribution") {
                    self.distributions.insert(def.name.name.clone(), def.clone());
                }
            }
            Item::RemoteEvent(def) => {
                if self.register(&def.name, "remote event") {
                    self.remote_events.insert(def.name.name.clone(), def.clone());
                }
            }
            Item::Event(def) => {
                if self.register(&def.name, "event") {
                    self.events.insert(def.name.name.clone(), def.clone());
                }
            }
        }
    }

    fn register(&mut self, name: &Ident, kind: &'static str) -> bool {
        if self.names.insert(name.name.clone(), kind).is_some() {
            self.diagnostics
                .push(ResolutionError::duplicate(&name.name, kind, name));
            false
        } else {
            true
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

fn detect_cycle(
    name: &str,
    members: &BTreeMap<String, Vec<GroupMember>>,
    state: &mut HashMap<String, VisitState>,
    diagnostics: &mut Vec<ResolutionError>,
) {
    match state.get(name) {
        Some(VisitState::Done) => return,
        Some(VisitState::InProgress) => {
            diagnostics.push(ResolutionError::CyclicGroup {
                name: name.to_string(),
            });
            return;
        }
        None => {}
    }
    state.insert(name.to_string(), VisitState::InProgress);
    if let Some(list) = members.get(name) {
        for member in list {
            if let GroupMember::Group(child) = member {
                detect_cycle(child, members, state, diagnostics);
            }
        }
    }
    state.insert(name.to_string(), VisitState::Done);
}

fn flatten_leaves(
    name: &str,
    members: &BTreeMap<String, Vec<GroupMember>>,
    cache: &mut HashMap<String, Vec<String>>,
) -> Vec<String> {
    if let Some(cached) = cache.get(name) {
        return cached.clone();
    }
    let mut leaves = Vec::new();
    if let Some(list) = members.get(name) {
        for member in list {
            match member {
                GroupMember::Type(t) => {
                    if !leaves.contains(t) {
                        leaves.push(t.clone());
                    }
                }
                GroupMember::Group(g) => {
                    for leaf in flatten_leaves(g, members, cache) {
                        if !leaves.contains(&leaf) {
                            leaves.push(leaf);
                        }
                    }
                }
            }
        }
    }
    cache.insert(name.to_string(), leaves.clone());
    leaves
}

fn resolved_property(prop: &ast::PropertyDef) -> Property {
    Property {
        id: prop.id.name.clone(),
        kind: prop.kind,
        default: prop.default.clone(),
    }
}

/// The identifiers a group's property defaults may reference: `amount` plus
/// the group's own property ids.
fn group_scope(name: &str, program: &ResolvedProgram) -> BTreeSet<String> {
    let mut scope = BTreeSet::new();
    scope.insert("amount".to_string());
    if let Some(group) = program.groups.get(name) {
        scope.extend(group.properties.keys().cloned());
    }
    scope
}

/// Collects the free identifiers of an expression: bare variables and the
/// roots of dotted paths.
pub fn free_identifiers(expr: &Expression, out: &mut BTreeSet<String>) {
    match expr {
        Expression::Literal(_) => {}
        Expression::Variable(name) => {
            out.insert(name.clone());
        }
        Expression::Path(segments) => {
            out.insert(segments[0].clone());
        }
        Expression::BinaryOp { left, right, .. } => {
            free_identifiers(left, out);
            free_identifiers(right, out);
        }
        Expression::UnaryOp { expr, .. } => free_identifiers(expr, out),
        Expression::Range { min, max } => {
            free_identifiers(min, out);
            free_identifiers(max, out);
        }
        Expression::Random(inner) => free_identifiers(inner, out),
        Expression::Duration { value, .. } => free_identifiers(value, out),
        Expression::List(items) => {
            for item in items {
                free_identifiers(&item.value, out);
                if let Some(key) = &item.key {
                    free_identifiers(key, out);
                }
            }
        }
    }
}
