//! embassy-net as the connection manager's IP stack
//!
//! embassy-net serves a single interface and is brought up before the
//! manager exists, so `init` has nothing to do and `attach` only stages the
//! addressing mode that `ip_up` applies.

use core::cell::Cell;
use core::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use defmt::info;
use ecm_core::hal_abstractions::{
    EthInterface, InterfaceKind, Ipv4Settings, Ipv6Scope, MacAddress, NetworkStack, StackError,
};
use embassy_net::{ConfigV4, DhcpConfig, Ipv4Cidr, Stack, StaticConfigV4};
use embassy_time::Duration;

/// Per-attachment state handed to the manager
pub struct NetContext {
    static_ip: Option<Ipv4Settings>,
    tracking: Cell<bool>,
    /// Last address reported, `None` until the first lease
    last_address: Cell<Option<Ipv4Addr>>,
}

pub struct EmbassyNetStack {
    stack: Stack<'static>,
    attached: Cell<bool>,
}

impl EmbassyNetStack {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            attached: Cell::new(false),
        }
    }

    fn current_v4(&self) -> Result<StaticConfigV4, StackError> {
        self.stack.config_v4().ok_or(StackError::NotReady)
    }
}

fn static_config(settings: &Ipv4Settings) -> Result<StaticConfigV4, StackError> {
    let prefix = settings.prefix_len().ok_or(StackError::AttachFailed)?;
    Ok(StaticConfigV4 {
        address: Ipv4Cidr::new(settings.address, prefix),
        gateway: Some(settings.gateway),
        dns_servers: Default::default(),
    })
}

impl NetworkStack for EmbassyNetStack {
    type Context = NetContext;

    fn init(&self) -> Result<(), StackError> {
        info!("embassy-net stack ready");
        Ok(())
    }

    fn deinit(&self) {
        self.stack.set_config_v4(ConfigV4::None);
    }

    fn attach(
        &self,
        _kind: InterfaceKind,
        iface: EthInterface,
        mac: MacAddress,
        static_ip: Option<&Ipv4Settings>,
    ) -> Result<Self::Context, StackError> {
        if iface != EthInterface::Eth0 || self.attached.get() {
            return Err(StackError::AttachFailed);
        }
        if let Some(settings) = static_ip {
            static_config(settings)?;
        }
        info!(
            "{}: attached {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            iface, mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        );
        self.attached.set(true);
        Ok(NetContext {
            static_ip: static_ip.copied(),
            tracking: Cell::new(false),
            last_address: Cell::new(None),
        })
    }

    fn detach(&self, _ctx: Self::Context) -> Result<(), StackError> {
        self.stack.set_config_v4(ConfigV4::None);
        self.attached.set(false);
        Ok(())
    }

    async fn ip_up(&self, ctx: &Self::Context) -> Result<(), StackError> {
        let config = match &ctx.static_ip {
            Some(settings) => ConfigV4::Static(static_config(settings)?),
            None => ConfigV4::Dhcp(DhcpConfig::default()),
        };
        self.stack.set_config_v4(config);
        Ok(())
    }

    fn ip_down(&self, _ctx: &Self::Context) -> Result<(), StackError> {
        self.stack.set_config_v4(ConfigV4::None);
        Ok(())
    }

    fn ipv4_address(&self, _ctx: &Self::Context) -> Result<Ipv4Addr, StackError> {
        Ok(self.current_v4()?.address.address())
    }

    fn ipv6_address(
        &self,
        _ctx: &Self::Context,
        _scope: Ipv6Scope,
    ) -> Result<Ipv6Addr, StackError> {
        Err(StackError::Unsupported)
    }

    fn gateway(&self, _ctx: &Self::Context) -> Result<Ipv4Addr, StackError> {
        self.current_v4()?.gateway.ok_or(StackError::NotReady)
    }

    fn netmask(&self, _ctx: &Self::Context) -> Result<Ipv4Addr, StackError> {
        Ok(self.current_v4()?.address.netmask())
    }

    fn gateway_mac(&self, _ctx: &Self::Context) -> Result<MacAddress, StackError> {
        // smoltcp keeps its neighbor cache private
        Err(StackError::Unsupported)
    }

    fn register_ip_change(&self, ctx: &Self::Context, enable: bool) {
        ctx.tracking.set(enable);
        ctx.last_address.set(None);
    }

    fn take_ip_change(&self, ctx: &Self::Context) -> bool {
        if !ctx.tracking.get() {
            return false;
        }
        let Some(current) = self.stack.config_v4().map(|c| c.address.address()) else {
            return false;
        };
        match ctx.last_address.replace(Some(current)) {
            Some(previous) if previous != current => {
                info!("DHCP renewal changed the address");
                true
            }
            _ => false,
        }
    }

    async fn ping(
        &self,
        _ctx: &Self::Context,
        _addr: IpAddr,
        _timeout: Duration,
    ) -> Result<Duration, StackError> {
        Err(StackError::Unsupported)
    }
}
