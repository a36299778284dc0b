//! Prompt templates for the spec → code → revise flow

use crate::core::string::truncate_middle;
use crate::strategy::entities::StrategyCode;

/// Compact QuantConnect API reference embedded in code prompts
pub const QC_API_REFERENCE: &str = include_str!("templates/qc_api_reference.md");

/// Compilable skeleton the code agent starts from
pub const REFERENCE_ALGORITHM: &str = include_str!("templates/reference_algorithm.py");

/// Compile errors listed in a retry prompt
pub const MAX_ERRORS_IN_PROMPT: usize = 10;

/// Spec text longer than this is shortened before reaching the code agent
pub const MAX_SPEC_LENGTH: usize = 8000;

const MAX_STACKTRACE_LENGTH: usize = 4000;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for the spec agent
    pub fn spec_system() -> &'static str {
        r#"You are the SPEC AGENT. Turn a verbal trading idea into a precise specification that can be implemented directly on QuantConnect.

Write every one of these sections:

1. STRATEGY OVERVIEW
   - One-sentence description
   - Core hypothesis: which market behavior does it exploit?

2. INSTRUMENTS
   - Asset: SPX index options (symbol SPX)
   - Calls, puts, or a combination
   - Expiration: 0DTE only (same-day expiry)
   - Strike selection (delta-based, fixed offset, ATM, ...)

3. ENTRY CONDITIONS
   - Time window in ET (e.g. "10:00 AM ET")
   - Required market conditions (VIX threshold, price filters)
   - Exact trigger logic

4. POSITION STRUCTURE
   - Single leg or multi-leg (spread, condor, ...)
   - Quantity and sizing
   - Delta or premium targets

5. EXIT CONDITIONS
   - Profit target
   - Stop loss
   - Time exit before the close
   - Any other exit trigger

6. RISK MANAGEMENT
   - Maximum position size as a share of the portfolio
   - Maximum daily loss
   - Conditions that skip trading

7. SCHEDULE
   - Trading days
   - Scheduled events

Finish with a JSON parameter block:
```json
{
  "strategy_type": "iron_condor|vertical_spread|straddle|single_leg|other",
  "entry_time": "HH:MM",
  "exit_time": "HH:MM",
  "profit_target_pct": 0.0,
  "stop_loss_pct": 0.0,
  "max_risk_pct": 0.0,
  "delta_target": 0.0,
  "min_premium": 0.0,
  "vix_threshold": 0
}
```

Use exact numbers and times. Leave nothing ambiguous."#
    }

    /// System prompt for the code agent, with API reference and skeleton
    pub fn code_system() -> String {
        format!(
            r#"You are the CODE AGENT. Produce complete, compilable QuantConnect Python code for 0DTE SPX option strategies.

## API REFERENCE
{}

## REFERENCE ALGORITHM
```python
{}
```

## RULES

1. Start from the reference algorithm; do not write from scratch.
2. Keep its patterns, especially None checks and option chain access.
3. Change only the parameters in Initialize(), CanTrade(), ExecuteEntry() and MonitorPositions().
4. Walk through a typical trading day before answering.

## COMMON PATTERNS

Sell: `self.MarketOrder(contract.Symbol, -1)`
Buy: `self.MarketOrder(contract.Symbol, 1)`
Pick by delta: `min(contracts, key=lambda c: abs(abs(c.Greeks.Delta) - target_delta))`
Out-of-the-money puts: `[c for c in puts if c.Strike < self.Securities[self.spx.Symbol].Price]`

## OUTPUT

1. One paragraph describing the implementation.
2. The entire algorithm in a single ```python block.
3. Nothing else."#,
            QC_API_REFERENCE.trim(),
            REFERENCE_ALGORITHM.trim()
        )
    }

    /// First code request: implement the spec
    pub fn code_prompt(spec_text: &str) -> String {
        format!(
            r#"Implement this strategy specification:

{}

Produce complete, compilable QuantConnect Python code following the reference algorithm and patterns in your instructions."#,
            truncate_middle(spec_text.trim(), MAX_SPEC_LENGTH)
        )
    }

    /// Revision request after a failed build
    pub fn compile_retry_prompt(code: &StrategyCode, errors: &[String]) -> String {
        let error_text = errors
            .iter()
            .take(MAX_ERRORS_IN_PROMPT)
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Your previous code failed to compile. Fix the errors and keep the strategy logic.

**Compilation errors:**
{}

**Your code:**
```python
{}
```

**API reference (follow exactly):**
{}

**Common fixes:**
- Option chain: `data.OptionChains.get(symbol)`, not `data.OptionChains[symbol]`
- Greeks: check `if c.Greeks and c.Greeks.Delta is not None`
- Imports: only `from AlgorithmImports import *`
- Time: `self.Time`, not `datetime.now()`

Return the complete fixed code in a single ```python block. Do not explain the changes."#,
            error_text,
            code.as_str(),
            QC_API_REFERENCE.trim()
        )
    }

    /// Revision request after the backtest crashed
    pub fn runtime_error_prompt(
        code: &StrategyCode,
        error: &str,
        stacktrace: Option<&str>,
    ) -> String {
        let trace = stacktrace
            .map(|s| truncate_middle(s.trim(), MAX_STACKTRACE_LENGTH))
            .unwrap_or_else(|| "No stack trace reported".to_string());

        format!(
            r#"Your code compiled, but the backtest stopped with a runtime error.

**Runtime error:**
{}

**Stack trace:**
```
{}
```

**Current code:**
```python
{}
```

Find the failing line, guard it (None checks, empty lists, missing chains, division by zero) and keep the strategy logic.

Return the complete fixed code in a single ```python block."#,
            error.trim(),
            trace,
            code.as_str()
        )
    }

    /// Revision request after a clean backtest that placed no trades
    pub fn zero_trades_prompt(code: &StrategyCode, backtest_info: Option<&str>) -> String {
        format!(
            r#"The code compiles and backtests, but placed 0 trades.

**Likely causes:**
1. Entry conditions too strict (time window, VIX filter, delta targets)
2. Option filter too narrow: no contracts match
3. Scheduled handler never fires or finds no chain
4. A logic error that skips order placement

**Backtest info:**
{}

**Current code:**
```python
{}
```

**What to do:**
1. Add Debug() logging: when scheduled handlers run, how many contracts survive filtering, which entry check fails.
2. Relax filters: widen strikes in SetFilter (e.g. -50 to +50), loosen delta tolerance or minimum premium, extend time windows.
3. Check option chain access.
4. Place orders with contract.Symbol, never a string.

Return the complete revised code in a single ```python block."#,
            backtest_info.unwrap_or("No additional info"),
            code.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> StrategyCode {
        StrategyCode::new("class A(QCAlgorithm):\n    pass").unwrap()
    }

    #[test]
    fn test_code_system_embeds_reference() {
        let prompt = PromptTemplate::code_system();
        assert!(prompt.contains("class SPX0DTEStrategy(QCAlgorithm)"));
        assert!(prompt.contains("QuantConnect API Quick Reference"));
    }

    #[test]
    fn test_code_prompt_contains_spec() {
        let prompt = PromptTemplate::code_prompt("  Sell 0.15 delta iron condors  ");
        assert!(prompt.contains("Sell 0.15 delta iron condors"));
    }

    #[test]
    fn test_compile_retry_limits_errors() {
        let errors: Vec<String> = (1..=15).map(|i| format!("error number {}", i)).collect();
        let prompt = PromptTemplate::compile_retry_prompt(&code(), &errors);
        assert!(prompt.contains("error number 10\n"));
        assert!(!prompt.contains("error number 11"));
        assert!(prompt.contains("class A(QCAlgorithm)"));
        assert!(prompt.contains("Common fixes"));
    }

    #[test]
    fn test_runtime_prompt_without_stacktrace() {
        let prompt = PromptTemplate::runtime_error_prompt(&code(), "KeyError: 'SPX'", None);
        assert!(prompt.contains("KeyError: 'SPX'"));
        assert!(prompt.contains("No stack trace reported"));
    }

    #[test]
    fn test_zero_trades_prompt() {
        let prompt = PromptTemplate::zero_trades_prompt(&code(), Some(r#"{"trades": 0}"#));
        assert!(prompt.contains("0 trades"));
        assert!(prompt.contains(r#"{"trades": 0}"#));
        let prompt = PromptTemplate::zero_trades_prompt(&code(), None);
        assert!(prompt.contains("No additional info"));
    }
}
