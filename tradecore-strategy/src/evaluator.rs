use std::collections::BTreeMap;
use tradecore_instrument::{Condition, ConditionGroup, LogicConnector, VariantId};

/// Evaluates one [`ConditionGroup`] against the latest known indicator
/// values for a symbol, returning `(satisfied, condition_ids_that_were_true)`.
///
/// Implements the left-to-right, short-circuit logic described in spec.md
/// §4.4 (ported from
/// `examples/original_source/src/engine/strategy_evaluator_4section.py`'s
/// `_evaluate_conditions_with_logic`): each condition's `logic` tag governs
/// how its own result combines with the running accumulator — `NOT` inverts
/// the condition's own result; `AND`/`OR` become the connector applied to
/// the *next* condition. A missing indicator evaluates the condition to
/// `false` rather than raising (spec.md §4.4 "Failure modes").
///
/// `AND` binds tighter than `OR`: a `NOT`-tagged condition doesn't carry an
/// enclosing `OR` forward past itself, so `[A(OR), B(NOT), C]` groups as
/// `A OR ((NOT B) AND C)`, not `(A OR (NOT B)) AND C` nor `A OR (NOT B) OR
/// C` — the next connector resets to `AND` once a `NOT` has been applied,
/// per spec.md §8 scenario 3.
pub fn evaluate_group(group: &ConditionGroup, indicator_values: &BTreeMap<VariantId, f64>) -> (bool, Vec<VariantId>) {
    if group.conditions.is_empty() {
        return (true, Vec::new());
    }

    let mut result = true;
    let mut next_logic = LogicConnector::And;
    let mut met = Vec::new();

    for (index, condition) in group.conditions.iter().enumerate() {
        let raw = evaluate_condition(condition, indicator_values);
        let condition_result = if condition.logic == LogicConnector::Not { !raw } else { raw };
        if condition_result {
            met.push(condition.indicator_id.clone());
        }

        if index == 0 {
            result = condition_result;
        } else {
            match next_logic {
                LogicConnector::And => {
                    result = result && condition_result;
                    if !result {
                        return (false, met);
                    }
                }
                LogicConnector::Or => {
                    result = result || condition_result;
                    if result {
                        return (true, met);
                    }
                }
                LogicConnector::Not => unreachable!("next_logic is only ever set to And or Or"),
            }
        }

        next_logic = match condition.logic {
            LogicConnector::And => LogicConnector::And,
            LogicConnector::Or => LogicConnector::Or,
            // A NOT only inverts its own condition; it does not carry an
            // enclosing OR forward, so the next condition resumes ANDing in.
            LogicConnector::Not => LogicConnector::And,
        };
    }

    (result, met)
}

fn evaluate_condition(condition: &Condition, indicator_values: &BTreeMap<VariantId, f64>) -> bool {
    match indicator_values.get(&condition.indicator_id) {
        Some(value) => condition.operator.evaluate(*value, condition.value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradecore_instrument::Operator;

    fn value_map(pairs: &[(&str, f64)]) -> BTreeMap<VariantId, f64> {
        pairs.iter().map(|(id, v)| (VariantId::new(*id), *v)).collect()
    }

    fn cond(id: &str, op: Operator, value: f64) -> Condition {
        Condition::new(VariantId::new(id), op, value)
    }

    #[test]
    fn empty_group_is_vacuously_true() {
        let group = ConditionGroup::new(vec![]);
        assert_eq!(evaluate_group(&group, &BTreeMap::new()).0, true);
    }

    #[test]
    fn plain_and_chain_short_circuits_on_first_false() {
        let group = ConditionGroup::new(vec![
            cond("a", Operator::Gt, 1.0),
            cond("b", Operator::Gt, 1.0),
        ]);
        let values = value_map(&[("a", 2.0), ("b", 0.5)]);
        assert_eq!(evaluate_group(&group, &values).0, false);
    }

    #[test]
    fn or_short_circuits_true() {
        let group = ConditionGroup::new(vec![
            cond("a", Operator::Gt, 1.0).with_logic(LogicConnector::Or),
            cond("b", Operator::Gt, 1.0),
        ]);
        // [A(OR), B] = A OR B; A is true so the whole group is true without needing B.
        let values = value_map(&[("a", 2.0)]);
        assert_eq!(evaluate_group(&group, &values).0, true);
    }

    #[test]
    fn not_inverts_only_its_own_condition() {
        // [A, B(NOT), C] = A AND (NOT B) AND C
        let group = ConditionGroup::new(vec![
            cond("a", Operator::Gt, 1.0),
            cond("b", Operator::Gt, 1.0).with_logic(LogicConnector::Not),
            cond("c", Operator::Gt, 1.0),
        ]);
        let values = value_map(&[("a", 2.0), ("b", 0.5), ("c", 2.0)]);
        assert_eq!(evaluate_group(&group, &values).0, true);
    }

    #[test]
    fn or_then_not_does_not_carry_or_past_the_not() {
        // spec.md §8 scenario 3: [A(OR), B(NOT), C] with A=false, B=true, C=true
        // = (false) OR ((NOT true) AND true) = false OR (false AND true) = false.
        let group = ConditionGroup::new(vec![
            cond("a", Operator::Gt, 1.0).with_logic(LogicConnector::Or),
            cond("b", Operator::Gt, 1.0).with_logic(LogicConnector::Not),
            cond("c", Operator::Gt, 1.0),
        ]);
        let values = value_map(&[("a", 0.5), ("b", 2.0), ("c", 2.0)]);
        assert_eq!(evaluate_group(&group, &values).0, false);
    }

    #[test]
    fn missing_indicator_evaluates_condition_false() {
        let group = ConditionGroup::new(vec![cond("missing", Operator::Gt, 1.0)]);
        assert_eq!(evaluate_group(&group, &BTreeMap::new()).0, false);
    }

    #[test]
    fn equality_uses_epsilon() {
        let group = ConditionGroup::new(vec![cond("a", Operator::Eq, 1.0)]);
        let values = value_map(&[("a", 1.000_000_000_1)]);
        assert_eq!(evaluate_group(&group, &values).0, true);
    }
}
