//! Server-side Lua scripts.
//!
//! Each queue operation runs as one script so Redis executes the read and the
//! mutation as a single step.

use redis::Script;

/// Lower bound of the pop range. Entries scored below it are never popped.
pub const POP_MIN_SCORE: &str = "0";

/// Upper bound of the pop range.
pub const POP_MAX_SCORE: &str = "+inf";

/// Add `ARGV[1]` to the score of member `ARGV[2]`, creating it if absent.
pub const PUSH_ONE: &str = r#"
local key = KEYS[1]
local increment = ARGV[1]
local member = ARGV[2]
return redis.call('ZINCRBY', key, increment, member)
"#;

/// Pairs of `(increment, member)` in ARGV, applied in order.
pub const BATCH_PUSH: &str = r#"
local key = KEYS[1]
local results = {}
for i = 1, #ARGV, 2 do
    local new_score = redis.call('ZINCRBY', key, ARGV[i], ARGV[i + 1])
    table.insert(results, new_score)
end
return results
"#;

/// Remove and return the lowest-scored member within `[ARGV[1], ARGV[2]]`.
pub const POP_ONE: &str = r#"
local members = redis.call('ZRANGEBYSCORE', KEYS[1], ARGV[1], ARGV[2], 'LIMIT', 0, 1)
if #members > 0 then
    redis.call('ZREM', KEYS[1], members[1])
end
return members
"#;

/// Remove and return up to `ARGV[3]` lowest-scored members within `[ARGV[1], ARGV[2]]`.
pub const BATCH_POP: &str = r#"
local members = redis.call('ZRANGEBYSCORE', KEYS[1], ARGV[1], ARGV[2], 'LIMIT', 0, ARGV[3])
for _, member in ipairs(members) do
    redis.call('ZREM', KEYS[1], member)
end
return members
"#;

/// The four queue scripts, hashed once.
#[derive(Clone)]
pub struct QueueScripts {
    pub push_one: Script,
    pub batch_push: Script,
    pub pop_one: Script,
    pub batch_pop: Script,
}

impl QueueScripts {
    pub fn new() -> Self {
        Self {
            push_one: Script::new(PUSH_ONE),
            batch_push: Script::new(BATCH_PUSH),
            pop_one: Script::new(POP_ONE),
            batch_pop: Script::new(BATCH_POP),
        }
    }
}

impl Default for QueueScripts {
    fn default() -> Self {
        Self::new()
    }
}
