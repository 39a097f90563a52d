//! Difficulty retargeting and proof-of-work validation.
//!
//! The main retarget is a dampened moving-window average: it walks the chain
//! backwards from the tip, folding each block's target into a running
//! average, and stops once the window is large enough *and* the observed
//! block rate has drifted outside a tolerance envelope that tightens as the
//! window grows. The average is then scaled by observed-over-intended
//! seconds and clamped to the network's `pow_limit`.
//!
//! The envelope test uses `f64`, but only as a loop-exit heuristic: every
//! bit of the returned compact target is produced by 256-bit integer
//! arithmetic, so all nodes agree on the result exactly.
use crate::block::{target, Bits, BlockHash, HeaderView, Target};
use crate::network::Network;
use crate::params::Params;

/// Compute the compact target the block following `tip` must satisfy.
///
/// Returns `compact(pow_limit)` when there is no tip or the chain is still
/// shorter than the minimum averaging window.
pub fn next_work_required<H: HeaderView>(tip: Option<&H>, params: &Params) -> Bits {
    let pow_limit_bits = target::to_compact(params.pow_limit);
    let last = match tip {
        Some(last) => last,
        None => return pow_limit_bits,
    };

    // Testnet and regtest keep the previous difficulty as-is.
    if params.allow_min_difficulty_blocks {
        return last.bits();
    }

    let spacing = params.pow_target_spacing as i64;
    let past_seconds_min = (params.pow_target_timespan as f64 * 0.025) as i64;
    let past_seconds_max = params.pow_target_timespan as i64 * 7;
    let past_blocks_min = (past_seconds_min / spacing) as u64;
    let past_blocks_max = (past_seconds_max / spacing) as u64;

    if last.height() == 0 || last.height() < past_blocks_min {
        return pow_limit_bits;
    }

    let mut average = Target::default();
    let mut actual_seconds: i64 = 0;
    let mut target_seconds: i64 = 0;
    let mut latest_time = last.time() as i64;
    let mut mass: u64 = 0;

    let mut reading = Some(last);
    while let Some(block) = reading {
        if block.height() == 0 {
            break;
        }
        if past_blocks_max > 0 && mass >= past_blocks_max {
            break;
        }
        mass += 1;

        let (block_target, _, _) = target::from_compact(block.bits());
        average = if mass == 1 {
            block_target
        } else {
            // Running average in signed bignum semantics: the delta may be
            // negative and its division truncates toward zero.
            if block_target >= average {
                target::add(
                    average,
                    target::div_u64(target::sub(block_target, average), mass),
                )
            } else {
                target::sub(
                    average,
                    target::div_u64(target::sub(average, block_target), mass),
                )
            }
        };

        // Blocks right above genesis get a laxer time clamp.
        let mature = block.height() > 1
            || (params.network == Network::Testnet && block.height() >= 10);
        let time = block.time() as i64;
        if latest_time < time && mature {
            latest_time = time;
        }
        actual_seconds = latest_time - time;
        target_seconds = spacing * mass as i64;
        if mature {
            if actual_seconds < 1 {
                actual_seconds = 1;
            }
        } else if actual_seconds < 0 {
            actual_seconds = 0;
        }
        let mut ratio = 1f64;
        if actual_seconds != 0 && target_seconds != 0 {
            ratio = target_seconds as f64 / actual_seconds as f64;
        }

        // Tolerance envelope around the intended/observed rate; it widens
        // for small windows and contracts as more blocks are folded in.
        let deviation = 1.0 + 0.7084 * (mass as f64 / 28.2).powf(-1.228);
        if mass >= past_blocks_min && (ratio <= 1.0 / deviation || ratio >= deviation) {
            break;
        }
        reading = block.prev();
    }

    let mut new_target = average;
    if actual_seconds != 0 && target_seconds != 0 {
        new_target = target::div_u64(
            target::mul_u64(new_target, actual_seconds as u64),
            target_seconds as u64,
        );
    }
    if new_target > params.pow_limit {
        new_target = params.pow_limit;
    }
    target::to_compact(new_target)
}

/// Classic bounded retarget: scale the tip's target by the timespan observed
/// since `first_block_time`, limited to a factor of four either way.
///
/// Callers choose the retarget interval; this routine only applies it.
pub fn calculate_next_work_required<H: HeaderView>(
    tip: &H,
    first_block_time: i64,
    params: &Params,
) -> Bits {
    if params.no_pow_retargeting {
        return tip.bits();
    }

    let timespan = params.pow_target_timespan as i64;
    let mut actual_timespan = tip.time() as i64 - first_block_time;
    if actual_timespan < timespan / 4 {
        actual_timespan = timespan / 4;
    }
    if actual_timespan > timespan * 4 {
        actual_timespan = timespan * 4;
    }

    let (tip_target, _, _) = target::from_compact(tip.bits());
    let mut new_target = target::div_u64(
        target::mul_u64(tip_target, actual_timespan as u64),
        params.pow_target_timespan,
    );
    if new_target > params.pow_limit {
        new_target = params.pow_limit;
    }
    target::to_compact(new_target)
}

/// Check that a block hash satisfies its declared compact target, and that
/// the target itself is within the network's valid range.
pub fn check_proof_of_work(hash: &BlockHash, bits: Bits, params: &Params) -> bool {
    let (required, negative, overflow) = target::from_compact(bits);

    if negative || required == Target::default() || overflow || required > params.pow_limit {
        return false;
    }
    target::from_hash(hash) <= required
}
