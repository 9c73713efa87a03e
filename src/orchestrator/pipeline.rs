//! 页面流水线 - 编排层
//!
//! 扫描 → 筛选 → 分派 → 求解。连续模式在外层循环翻页，直到没有下一节为止。
//! 每个阶段之间、每次翻页之前都会检查停止信号。

use tracing::{debug, info};

use crate::error::{AppResult, DriverResult};
use crate::infrastructure::ElementHandle;
use crate::models::{QuestionKind, QuestionRecord, RunMode, RunReport, RunRequest, ScanResult};
use crate::services::pacing::DelayModel;
use crate::services::scanner;
use crate::utils::logging::{log_banner, RULE_WIDTH};
use crate::workflow::{solve_batch, AnimationSolver, ChoiceSolver, ShortAnswerSolver, SolveCtx, Solver};

/// 连续模式的横幅宽度
const PAGE_RULE_WIDTH: usize = 60;
/// 滚动到下一节链接后的停顿
const LINK_SETTLE: DelayModel = DelayModel::bell(300.0, 50.0, 200.0, 400.0);
/// 翻页后等待新页面加载
const NAVIGATION_SETTLE: DelayModel = DelayModel::bell(4000.0, 200.0, 3800.0, 4200.0);

/// 一次翻页尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    Navigated,
    LastSection,
    Stopped,
}

/// 按运行模式和强制模式筛选记录，保持扫描顺序
///
/// 纯函数：记录被保留，当且仅当类型与模式匹配（或为全部求解模式），
/// 并且强制模式开启或记录尚未完成。
pub fn filter_records(scan: &ScanResult, mode: RunMode, force_mode: bool) -> Vec<QuestionRecord> {
    scan.records
        .iter()
        .filter(|record| wants(mode, record.kind))
        .filter(|record| force_mode || !record.completed)
        .cloned()
        .collect()
}

fn wants(mode: RunMode, kind: QuestionKind) -> bool {
    match mode.target_kind() {
        Some(target) => target == kind,
        None => mode.is_solve_all(),
    }
}

/// 每种题目类型对应唯一的求解器
pub fn solver_for(kind: QuestionKind) -> &'static dyn Solver {
    match kind {
        QuestionKind::ChoiceQuestion => &ChoiceSolver,
        QuestionKind::Animation => &AnimationSolver,
        QuestionKind::ShortAnswer => &ShortAnswerSolver,
    }
}

fn group_title(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::ChoiceQuestion => "Radio Questions",
        QuestionKind::Animation => "Animations",
        QuestionKind::ShortAnswer => "Short Answer",
    }
}

/// 执行一次运行请求
///
/// 会话错误中止本次运行并向上传递；其余失败都在记录级别消化。
pub async fn run(ctx: &SolveCtx<'_>, request: RunRequest) -> AppResult<RunReport> {
    let mut report = RunReport::new(request.mode, request.force_mode);
    info!("Starting: {} (Force Mode: {})", request.mode, request.force_mode);

    match request.mode {
        RunMode::SolveAllContinuous => run_continuous(ctx, request, &mut report).await?,
        _ => run_page(ctx, request, &mut report).await?,
    }

    Ok(report)
}

/// 处理当前页面
async fn run_page(ctx: &SolveCtx<'_>, request: RunRequest, report: &mut RunReport) -> AppResult<()> {
    report.pages += 1;

    // 阶段 1：扫描
    log_banner("PHASE 1: SCANNING PAGE", RULE_WIDTH);
    let scan = scanner::scan(ctx.driver, ctx.selectors()).await?;
    report.scanned = scan.len();

    if scan.is_empty() {
        info!("No questions found on page!");
        return Ok(());
    }
    if request.mode == RunMode::ScanOnly {
        info!("✓ Scan complete! (Scan Only mode - no solving)");
        return Ok(());
    }
    if ctx.should_stop() {
        report.cancelled = true;
        return Ok(());
    }

    // 阶段 2：筛选
    log_banner("PHASE 2: FILTERING QUESTIONS", RULE_WIDTH);
    let records = filter_records(&scan, request.mode, request.force_mode);
    if records.is_empty() {
        info!("No questions to process after filtering");
        return Ok(());
    }
    info!("Filtered to {} questions for processing", records.len());

    if ctx.should_stop() {
        report.cancelled = true;
        return Ok(());
    }

    // 阶段 3：按类型分组求解
    log_banner("PHASE 3: SOLVING QUESTIONS", RULE_WIDTH);
    for kind in QuestionKind::ALL {
        let group: Vec<QuestionRecord> = records.iter().filter(|r| r.kind == kind).cloned().collect();
        if group.is_empty() {
            continue;
        }
        if ctx.should_stop() {
            report.cancelled = true;
            return Ok(());
        }

        if request.mode.is_solve_all() {
            info!("--- {} ---", group_title(kind));
        }
        let batch = solve_batch(solver_for(kind), ctx, &group).await?;
        report.absorb(&batch);
        if batch.cancelled {
            return Ok(());
        }
    }

    info!("✓ Solver execution completed!");
    Ok(())
}

/// 逐页求解，直到找不到下一节或收到停止信号
async fn run_continuous(ctx: &SolveCtx<'_>, request: RunRequest, report: &mut RunReport) -> AppResult<()> {
    info!("This will solve all questions on each page, then move to the next section");
    let page_request = RunRequest::new(RunMode::SolveAllOnPage, request.force_mode);

    loop {
        if ctx.should_stop() {
            report.cancelled = true;
            break;
        }

        log_banner(&format!("PAGE {}", report.pages + 1), PAGE_RULE_WIDTH);
        run_page(ctx, page_request, report).await?;

        if report.cancelled || ctx.should_stop() {
            report.cancelled = true;
            break;
        }

        log_banner("NAVIGATING TO NEXT SECTION", RULE_WIDTH);
        match click_next_section(ctx).await? {
            Navigation::Navigated => {}
            Navigation::LastSection => {
                info!("No more sections found - continuous solving complete!");
                break;
            }
            Navigation::Stopped => {
                report.cancelled = true;
                break;
            }
        }

        info!("Waiting 4 seconds for page to load...");
        ctx.pause(&NAVIGATION_SETTLE).await;
    }

    log_banner("CONTINUOUS SOLVING COMPLETED!", PAGE_RULE_WIDTH);
    info!("Processed {} pages", report.pages);
    Ok(())
}

/// 找到并点击下一节链接
async fn click_next_section(ctx: &SolveCtx<'_>) -> DriverResult<Navigation> {
    let Some(link) = find_next_section_link(ctx).await? else {
        info!("No next section link found (might be last section)");
        return Ok(Navigation::LastSection);
    };

    let section = ctx.driver.text(link).await?;
    info!("Found next section link: '{}'", section);
    let href = ctx.driver.attribute(link, "href").await?.unwrap_or_default();
    info!("Target URL: {}", href);

    ctx.driver.scroll_into_view(link).await?;
    ctx.pause(&LINK_SETTLE).await;
    if ctx.should_stop() {
        return Ok(Navigation::Stopped);
    }

    info!("Clicking next section link...");
    match ctx.driver.click(link).await {
        Ok(()) => info!("✓ Clicked! Navigating to: {}", section),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            info!("Normal click failed ({}), using JavaScript click", e);
            ctx.driver.js_click(link).await?;
            info!("✓ JavaScript click successful! Navigating to: {}", section);
        }
    }
    Ok(Navigation::Navigated)
}

/// 下一节图标的父元素就是链接
async fn find_next_section_link(ctx: &SolveCtx<'_>) -> DriverResult<Option<ElementHandle>> {
    let Some(icon) = ctx.driver.find_first(None, &ctx.selectors().next_section_icon).await? else {
        return Ok(None);
    };
    let link = ctx.driver.parent(icon).await?;
    if link.is_none() {
        debug!("next section icon {} has no parent", icon);
    }
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_of(entries: &[(QuestionKind, bool)]) -> ScanResult {
        ScanResult {
            records: entries
                .iter()
                .enumerate()
                .map(|(i, &(kind, completed))| QuestionRecord::new(i, kind, ElementHandle(i as u64), completed))
                .collect(),
        }
    }

    fn kinds(records: &[QuestionRecord]) -> Vec<(QuestionKind, bool)> {
        records.iter().map(|r| (r.kind, r.completed)).collect()
    }

    #[test]
    fn test_filter_property_table() {
        use QuestionKind::*;
        let scan = scan_of(&[
            (Animation, true),
            (ChoiceQuestion, false),
            (ShortAnswer, false),
            (ChoiceQuestion, true),
            (Animation, false),
        ]);

        let cases: &[(RunMode, bool, Vec<(QuestionKind, bool)>)] = &[
            (RunMode::ScanOnly, false, vec![]),
            (RunMode::ScanOnly, true, vec![]),
            (
                RunMode::SolveAllOnPage,
                false,
                vec![(ChoiceQuestion, false), (ShortAnswer, false), (Animation, false)],
            ),
            (
                RunMode::SolveAllContinuous,
                true,
                vec![
                    (Animation, true),
                    (ChoiceQuestion, false),
                    (ShortAnswer, false),
                    (ChoiceQuestion, true),
                    (Animation, false),
                ],
            ),
            (RunMode::SolveChoice, false, vec![(ChoiceQuestion, false)]),
            (RunMode::SolveChoice, true, vec![(ChoiceQuestion, false), (ChoiceQuestion, true)]),
            (RunMode::SolveAnimation, false, vec![(Animation, false)]),
            (RunMode::SolveShortAnswer, true, vec![(ShortAnswer, false)]),
        ];

        for (mode, force, expected) in cases {
            let filtered = filter_records(&scan, *mode, *force);
            assert_eq!(kinds(&filtered), *expected, "{mode} force={force}");
        }
    }

    #[test]
    fn test_filter_keeps_scan_order_and_indices() {
        let scan = scan_of(&[
            (QuestionKind::ShortAnswer, false),
            (QuestionKind::ChoiceQuestion, false),
            (QuestionKind::ShortAnswer, false),
        ]);
        let filtered = filter_records(&scan, RunMode::SolveShortAnswer, false);
        let indices: Vec<_> = filtered.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_every_kind_has_its_own_solver() {
        for kind in QuestionKind::ALL {
            assert_eq!(solver_for(kind).kind(), kind);
        }
    }
}
