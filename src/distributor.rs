//! The distributor: an all-to-all communication primitive built from a
//! per-item destination-rank list. It executes exactly one round of sends
//! and receives (one call to [`Comm::all_to_all_varying`]) and hands every
//! rank back the flattened list of items addressed to it, in the order they
//! arrived from each source rank (source-rank-ascending, then send-order
//! within a source). Callers that need determinism sort afterwards -- see
//! the import planner's use of `BTreeSet`/`BTreeMap`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::comm::Comm;
use crate::error::{RendezvousError, Result};

/// Ships `items[i]` to rank `destinations[i]` for every `i`, returning every
/// item this rank was sent, from any source.
pub fn distribute<T>(comm: &dyn Comm, items: &[T], destinations: &[i32]) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    assert_eq!(items.len(), destinations.len());

    let size = comm.size() as usize;
    let mut buckets: Vec<Vec<&T>> = vec![Vec::new(); size];
    for (item, &dest) in items.iter().zip(destinations) {
        buckets[dest as usize].push(item);
    }

    let send_by_rank: Vec<Vec<u8>> = buckets
        .iter()
        .map(|bucket| {
            bincode::serialize(bucket)
                .map_err(|e| RendezvousError::CommunicationError(format!("failed to encode export batch: {e}")))
        })
        .collect::<Result<_>>()?;

    let recv_by_rank = comm.all_to_all_varying(&send_by_rank);

    let mut received = Vec::new();
    for bytes in recv_by_rank {
        let batch: Vec<T> = bincode::deserialize(&bytes)
            .map_err(|e| RendezvousError::CommunicationError(format!("failed to decode import batch: {e}")))?;
        received.extend(batch);
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::thread_comm::ThreadComm;

    #[test]
    fn distribute_routes_items_to_their_destination_rank() {
        let comms = ThreadComm::world(3);
        std::thread::scope(|s| {
            for comm in &comms {
                s.spawn(move || {
                    // Every rank sends its own rank number to rank 0.
                    let items = vec![comm.rank() as u64];
                    let dests = vec![0i32];
                    let received = distribute(comm, &items, &dests).unwrap();
                    if comm.rank() == 0 {
                        let mut sorted = received;
                        sorted.sort();
                        assert_eq!(sorted, vec![0, 1, 2]);
                    } else {
                        assert!(received.is_empty());
                    }
                });
            }
        });
    }
}
