use super::{ComputeUnit, Env};
use crate::{
    emu,
    memory::Witness,
    sync::atomic,
    trace::Event,
    uop::{Flags, Timestamps, Uop},
};
use console::style;

impl ComputeUnit {
    /// Fetches at most one instruction per wavefront pool.
    ///
    /// Each pool examines a single entry per cycle, chosen round-robin
    /// among its valid entries. Entries released from `ready_next_cycle`
    /// in this cycle do not fetch before the next one.
    pub(super) fn fetch(&mut self, now: u64, env: &mut Env<'_>) -> Result<(), emu::Error> {
        let fetch_width = self.config.front_end.fetch_width;
        let fetch_latency = self.config.front_end.fetch_latency;
        let has_scalar_unit = self.scalar_unit.is_some();
        let mut fetched = 0;

        for pool_id in 0..self.pools.len() {
            let pool = &mut self.pools[pool_id];
            let released = pool.release_ready_next_cycle();
            let Some(entry_id) = pool.select() else {
                continue;
            };
            if fetched >= fetch_width {
                continue;
            }
            if released[entry_id] {
                continue;
            }

            let entry = pool.entry_mut(entry_id);
            if !entry.valid || !entry.ready || entry.wavefront_finished {
                continue;
            }
            let Some(wavefront_ref) = entry.wavefront else {
                continue;
            };
            if entry.wait_for_mem {
                if entry.memory_drained() {
                    entry.wait_for_mem = false;
                } else {
                    continue;
                }
            }
            if entry.wait_for_barrier {
                continue;
            }
            if self.fetch_buffers[pool_id].full() {
                continue;
            }

            let Some(work_group) = self.work_groups[wavefront_ref.slot].as_mut() else {
                panic!(
                    "cu {}: pool {pool_id} entry {entry_id} bound to empty slot {}",
                    self.id, wavefront_ref.slot
                );
            };
            let wavefront = &mut work_group.wavefronts[wavefront_ref.index];
            if wavefront.finished {
                continue;
            }

            let instruction = env.emulator.execute(wavefront)?;
            let opcode = instruction.opcode;
            let id = self.uop_uid.fetch_add(1, atomic::Ordering::SeqCst);
            let id_in_compute_unit = self.next_uop_id;
            self.next_uop_id += 1;
            let id_in_wavefront = wavefront.num_uops;
            wavefront.num_uops += 1;
            work_group.inflight += 1;

            let uop = self.uops.alloc(|mut accesses| {
                accesses.extend_from_slice(&instruction.accesses);
                Uop {
                    id,
                    id_in_compute_unit,
                    id_in_wavefront,
                    compute_unit_id: self.id,
                    work_group_id: work_group.id,
                    work_group_slot: wavefront_ref.slot,
                    wavefront_id: wavefront.id,
                    wavefront_index: wavefront_ref.index,
                    pool_id,
                    entry_id,
                    category: opcode.unit(has_scalar_unit),
                    flags: Flags::from(&opcode),
                    opcode,
                    asm: instruction.asm,
                    last_instruction: wavefront.finished,
                    ready: Timestamps {
                        fetch_ready: now + fetch_latency,
                        ..Timestamps::default()
                    },
                    witness: Witness::new(),
                    accesses,
                    accesses_issued: 0,
                }
            });
            self.pools[pool_id].entry_mut(entry_id).ready = false;

            log::debug!(
                "{}: fetched {} into pool {} (ready at {})",
                style(format!("cycle {now:03} cu {:>2}", self.id)).green(),
                uop,
                pool_id,
                uop.ready.fetch_ready
            );
            if env.sink.enabled() {
                env.sink.event(Event::NewInst {
                    id: uop.id_in_compute_unit,
                    compute_unit: self.id,
                    pool: pool_id,
                    work_group: uop.work_group_id,
                    wavefront: uop.wavefront_id,
                    id_in_wavefront: uop.id_in_wavefront,
                    asm: uop.asm.clone(),
                });
            }
            self.fetch_buffers[pool_id].enqueue(uop);
            self.stats.instructions += 1;
            fetched += 1;
        }
        Ok(())
    }
}
