//! 审批矩阵路由选择
//!
//! 对已加载的规则集做纯函数求值，不做任何 I/O。

use marlin_errors::{AppError, AppResult};
use rust_decimal::Decimal;

use super::{ApprovalLevel, ApprovalMatrixRule, RuleId};

/// 选中的审批路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRoute {
    pub rule_id: RuleId,
    /// 按 level 升序，即审批顺序
    pub levels: Vec<ApprovalLevel>,
}

/// 路由求值结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 存在唯一最佳匹配规则
    Route(ApprovalRoute),
    /// 无匹配规则，工作流引擎退化为单决策模式
    NotConfigured,
}

/// 选择最佳匹配规则
///
/// 过滤：激活 + 交易类型精确匹配 + 部门匹配（规则部门为空匹配任意）
/// + 金额闭区间。多个匹配时取金额区间最窄者；区间同宽时部门更具体
/// （非空）者胜出；仍然并列则为配置错误，绝不静默选择。
pub fn resolve(
    rules: &[ApprovalMatrixRule],
    transaction_type: &str,
    department: Option<&str>,
    amount: Decimal,
) -> AppResult<Resolution> {
    let candidates: Vec<&ApprovalMatrixRule> = rules
        .iter()
        .filter(|r| r.is_active)
        .filter(|r| r.transaction_type == transaction_type)
        .filter(|r| r.covers_department(department))
        .filter(|r| r.covers_amount(amount))
        .collect();

    let Some(best_width) = candidates.iter().map(|r| r.band_width()).min_by(band_cmp) else {
        return Ok(Resolution::NotConfigured);
    };

    let narrowest: Vec<&ApprovalMatrixRule> = candidates
        .into_iter()
        .filter(|r| band_cmp(&r.band_width(), &best_width) == std::cmp::Ordering::Equal)
        .collect();

    let specific: Vec<&ApprovalMatrixRule> = if narrowest.len() > 1 {
        let with_department: Vec<&ApprovalMatrixRule> = narrowest
            .iter()
            .copied()
            .filter(|r| r.department.is_some())
            .collect();
        if with_department.is_empty() {
            narrowest
        } else {
            with_department
        }
    } else {
        narrowest
    };

    match specific.as_slice() {
        [] => Ok(Resolution::NotConfigured),
        [rule] => {
            let mut levels = rule.levels.clone();
            levels.sort_by_key(|l| l.level);
            Ok(Resolution::Route(ApprovalRoute {
                rule_id: rule.id,
                levels,
            }))
        }
        ambiguous => Err(AppError::invalid_configuration(format!(
            "Ambiguous approval routing for {}/{:?}/{}: {} rules match with equal specificity",
            transaction_type,
            department,
            amount,
            ambiguous.len()
        ))),
    }
}

/// 区间宽度比较，None（无上界）视为最宽
fn band_cmp(a: &Option<Decimal>, b: &Option<Decimal>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(
        department: Option<&str>,
        min: i64,
        max: Option<i64>,
        level_count: i32,
    ) -> ApprovalMatrixRule {
        let levels = (1..=level_count)
            .map(|l| ApprovalLevel::by_role(l, format!("approver_l{}", l)))
            .collect();
        ApprovalMatrixRule::new(
            "quotation".to_string(),
            department.map(str::to_string),
            Decimal::new(min, 0),
            max.map(|m| Decimal::new(m, 0)),
            levels,
        )
    }

    #[test]
    fn test_no_match_is_not_configured() {
        let rules = vec![rule(None, 0, Some(100), 1)];
        let res = resolve(&rules, "quotation", None, Decimal::new(500, 0)).unwrap();
        assert_eq!(res, Resolution::NotConfigured);

        let res = resolve(&rules, "statement", None, Decimal::new(50, 0)).unwrap();
        assert_eq!(res, Resolution::NotConfigured);
    }

    #[test]
    fn test_inactive_rule_never_selected() {
        let mut r = rule(None, 0, Some(10_000), 1);
        r.is_active = false;
        let res = resolve(&[r], "quotation", None, Decimal::new(500, 0)).unwrap();
        assert_eq!(res, Resolution::NotConfigured);
    }

    #[test]
    fn test_department_specific_rule_wins() {
        // 同区间宽度：部门专属规则（1 级）优先于通用规则（2 级）
        let generic = rule(None, 0, Some(10_000), 2);
        let sales = rule(Some("sales"), 0, Some(10_000), 1);
        let rules = vec![generic, sales.clone()];

        let res = resolve(&rules, "quotation", Some("sales"), Decimal::new(5_000, 0)).unwrap();
        match res {
            Resolution::Route(route) => {
                assert_eq!(route.rule_id, sales.id);
                assert_eq!(route.levels.len(), 1);
            }
            other => panic!("expected route, got {:?}", other),
        }
    }

    #[test]
    fn test_narrowest_band_wins() {
        let wide = rule(None, 0, Some(100_000), 3);
        let narrow = rule(None, 0, Some(10_000), 2);
        let unbounded = rule(None, 0, None, 1);
        let rules = vec![wide, narrow.clone(), unbounded];

        let res = resolve(&rules, "quotation", None, Decimal::new(5_000, 0)).unwrap();
        match res {
            Resolution::Route(route) => assert_eq!(route.rule_id, narrow.id),
            other => panic!("expected route, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_beats_unbounded() {
        let bounded = rule(None, 0, Some(1_000_000), 2);
        let unbounded = rule(None, 0, None, 1);
        let rules = vec![unbounded, bounded.clone()];

        let res = resolve(&rules, "quotation", None, Decimal::new(500, 0)).unwrap();
        match res {
            Resolution::Route(route) => assert_eq!(route.rule_id, bounded.id),
            other => panic!("expected route, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_match_is_configuration_error() {
        let a = rule(None, 0, Some(10_000), 1);
        let b = rule(None, 0, Some(10_000), 2);
        let rules = vec![a, b];

        let err = resolve(&rules, "quotation", None, Decimal::new(5_000, 0)).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_levels_returned_in_sequence_order() {
        let mut r = rule(None, 0, Some(10_000), 3);
        r.levels.reverse();
        let res = resolve(&[r], "quotation", None, Decimal::new(100, 0)).unwrap();
        match res {
            Resolution::Route(route) => {
                let order: Vec<i32> = route.levels.iter().map(|l| l.level).collect();
                assert_eq!(order, vec![1, 2, 3]);
            }
            other => panic!("expected route, got {:?}", other),
        }
    }
}
