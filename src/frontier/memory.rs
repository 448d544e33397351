use crate::frontier::traits::{FrontierError, FrontierResult, SetStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemorySet {
    next_id: u64,
    by_id: BTreeMap<u64, String>,
    ids: HashMap<String, u64>,
}

/// Non-durable set store
///
/// Used when no database is configured: a single run behaves normally, but
/// nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySetStore {
    sets: Mutex<HashMap<String, MemorySet>>,
}

impl MemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> FrontierResult<MutexGuard<'_, HashMap<String, MemorySet>>> {
        self.sets
            .lock()
            .map_err(|e| FrontierError::LockPoisoned(e.to_string()))
    }
}

impl SetStore for MemorySetStore {
    fn set_add(&self, set: &str, member: &str) -> FrontierResult<bool> {
        let mut sets = self.sets()?;
        let entry = sets.entry(set.to_string()).or_default();
        if entry.ids.contains_key(member) {
            return Ok(false);
        }
        entry.next_id += 1;
        let id = entry.next_id;
        entry.by_id.insert(id, member.to_string());
        entry.ids.insert(member.to_string(), id);
        Ok(true)
    }

    fn set_remove(&self, set: &str, member: &str) -> FrontierResult<bool> {
        let mut sets = self.sets()?;
        let Some(entry) = sets.get_mut(set) else {
            return Ok(false);
        };
        match entry.ids.remove(member) {
            Some(id) => {
                entry.by_id.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_scan(&self, set: &str, cursor: u64, count: usize) -> FrontierResult<(u64, Vec<String>)> {
        let sets = self.sets()?;
        let Some(entry) = sets.get(set) else {
            return Ok((0, Vec::new()));
        };

        let batch: Vec<(u64, String)> = entry
            .by_id
            .range(cursor.saturating_add(1)..)
            .take(count)
            .map(|(id, member)| (*id, member.clone()))
            .collect();

        let next = match batch.last() {
            Some((id, _)) if batch.len() == count => *id,
            _ => 0,
        };
        Ok((next, batch.into_iter().map(|(_, member)| member).collect()))
    }
}
