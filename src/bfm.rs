use futures::SinkExt;
use futures_channel::mpsc::{self, Receiver, Sender, UnboundedReceiver};
use log::info;
use std::rc::Rc;

use crate::config::HarnessConfig;
use crate::driver::{Driver, DriverStats};
use crate::executor::Spawner;
use crate::monitor::{AnalysisPort, CommandMonitor, ResultMonitor};
use crate::sim::Sim;
use crate::sim_if::{Signal, SimIf};
use crate::transaction::{Command, ObservedCommand, ResultEvent};
use crate::trigger::Clock;
use crate::{TbError, TbObj, TbResult};

/// Bus-functional model of the multiplier's pins. Constructed per run and
/// owned by the test; producers hand commands to it through `send_op`.
pub struct Bfm {
    bus: Rc<dyn SimIf>,
    clock: Clock,
    spawner: Spawner,
    reset_cycles: u64,
    timeout: Option<u64>,
    cmd_tx: Sender<Command>,
    cmd_rx: Option<Receiver<Command>>,
    cmd_port: AnalysisPort<ObservedCommand>,
    result_port: AnalysisPort<ResultEvent>,
    stats: TbObj<DriverStats>,
}

impl Bfm {
    pub fn new(sim: &Sim, config: &HarnessConfig) -> Self {
        // a single sender on a zero-buffer channel gives exactly one slot
        let (cmd_tx, cmd_rx) = mpsc::channel(0);
        Self {
            bus: sim.bus(),
            clock: sim.clock(),
            spawner: sim.spawner(),
            reset_cycles: config.reset_cycles,
            timeout: config.timeout_cycles,
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            cmd_port: AnalysisPort::new(),
            result_port: AnalysisPort::new(),
            stats: TbObj::new(DriverStats::default()),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// New queue receiving every command seen on the pins.
    pub fn connect_commands(&mut self) -> TbResult<UnboundedReceiver<ObservedCommand>> {
        self.ensure_not_started()?;
        Ok(self.cmd_port.connect())
    }

    /// New queue receiving every result (or timeout) seen on the pins.
    pub fn connect_results(&mut self) -> TbResult<UnboundedReceiver<ResultEvent>> {
        self.ensure_not_started()?;
        Ok(self.result_port.connect())
    }

    fn ensure_not_started(&self) -> TbResult<()> {
        match self.cmd_rx {
            Some(_) => Ok(()),
            None => Err(TbError::AlreadyStarted),
        }
    }

    pub fn stats(&self) -> TbObj<DriverStats> {
        self.stats.clone()
    }

    /// Commands the driver has put on the pins so far.
    pub fn issued(&self) -> u64 {
        self.stats.get().issued
    }

    pub async fn reset(&self) -> TbResult<()> {
        let bus = self.bus.as_ref();
        bus.set_value(Signal::Rst, 1)?; // active high
        bus.set_value(Signal::OperandA, 0)?;
        bus.set_value(Signal::OperandB, 0)?;
        bus.set_value(Signal::Opcode, 0)?;
        bus.set_value(Signal::Start, 0)?;
        self.clock.clock_cycles(self.reset_cycles).await;
        bus.set_value(Signal::Rst, 0)?;
        let edge = self.clock.rising_edge().await;
        info!("edge {}: reset released", edge);
        Ok(())
    }

    /// Spawns the driver and both observers. Ports must be connected before.
    pub fn start_tasks(&mut self) -> TbResult<()> {
        let cmd_rx = self.cmd_rx.take().ok_or(TbError::AlreadyStarted)?;
        let driver = Driver::new(
            self.bus.clone(),
            self.clock.clone(),
            cmd_rx,
            self.timeout,
            self.stats.clone(),
        );
        let cmd_mon = CommandMonitor::new(
            self.bus.clone(),
            self.clock.clone(),
            std::mem::take(&mut self.cmd_port),
        );
        let result_mon = ResultMonitor::new(
            self.bus.clone(),
            self.clock.clone(),
            self.timeout,
            std::mem::take(&mut self.result_port),
        );
        self.spawner.spawn("cmd_driver", driver.run());
        self.spawner.spawn("cmd_mon", cmd_mon.run());
        self.spawner.spawn("result_mon", result_mon.run());
        Ok(())
    }

    /// Hands a command to the driver. Suspends while the single slot of the
    /// command channel is occupied; returns once the driver has taken it.
    pub async fn send_op(&mut self, cmd: Command) -> TbResult<()> {
        self.stats.get_mut().offered += 1;
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| TbError::ChannelClosed)
    }
}
