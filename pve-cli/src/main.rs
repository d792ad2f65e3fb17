mod logging;

use clap::{Args, Parser, Subcommand};
use proxmoxve::driver::flags::{FLAG_API_URL, FLAG_NODE, FLAG_OTP, FLAG_PASS, FLAG_USER};
use proxmoxve::driver::{CheckDriverOptions, Driver, MachineDriver, State, Verbosity, create_flags};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "docker-machine-driver-proxmoxve",
    version,
    about = "Machine driver that provisions Docker hosts as Proxmox VE virtual machines"
)]
struct Cli {
    #[command(flatten)]
    machine: MachineArgs,

    #[command(flatten)]
    proxmox: ProxmoxArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the configuration flags this driver accepts.
    Flags,
    /// Print the resolved configuration (the password is not shown).
    Config,
    /// Create the VM, boot it and wait until it has an IP address.
    Create,
    /// Print the machine state.
    State,
    /// Print the machine IP address (empty while unknown).
    Ip,
    /// Print the Docker endpoint URL (empty while unknown).
    Url,
    /// Print the hostname used for SSH.
    SshHostname,
    /// Start the VM.
    Start,
    /// Gracefully shut down the VM.
    Stop,
    /// Forcefully stop the VM.
    Kill,
    /// Shut down the VM, then start it again.
    Restart,
    /// Delete the VM.
    Remove,
}

#[derive(Debug, Clone, Args)]
struct MachineArgs {
    /// Machine name, also used as the VM name on the cluster.
    #[arg(long, global = true, env = "MACHINE_NAME", default_value = "default")]
    machine_name: String,

    /// Storage directory of the host tool.
    #[arg(long, global = true, default_value = "")]
    store_path: String,

    /// Known IP address of the machine; skips guest agent discovery.
    #[arg(long, global = true)]
    ip_address: Option<String>,

    /// Trace every API request and response.
    #[arg(long, global = true, env = "PROXMOXVE_DEBUG", default_value_t = false)]
    debug: bool,
}

#[derive(Debug, Clone, Args)]
struct ProxmoxArgs {
    /// Proxmox VE API URL (example: https://hostname:8006/api2/json).
    #[arg(long = "proxmoxve-api-url", global = true, env = "PROXMOXVE_API_URL", default_value = "")]
    api_url: String,

    /// Proxmox VE connection user.
    #[arg(long = "proxmoxve-user", global = true, env = "PROXMOXVE_USER", default_value = "root@pam")]
    user: String,

    /// Proxmox VE connection password.
    #[arg(
        long = "proxmoxve-pass",
        global = true,
        env = "PROXMOXVE_PASS",
        default_value = "",
        hide_env_values = true
    )]
    pass: String,

    /// Proxmox VE OTP token (optional).
    #[arg(
        long = "proxmoxve-otp",
        global = true,
        env = "PROXMOXVE_OTP",
        default_value = "",
        hide_env_values = true
    )]
    otp: String,

    /// Proxmox VE node.
    #[arg(long = "proxmoxve-node", global = true, env = "PROXMOXVE_NODE", default_value = "pve")]
    node: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.machine.debug);

    // The host tool shows this message to the user as is.
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = build_driver(&cli)?;
    debug!(machine = %driver.machine_name(), command = ?cli.command, "running driver command");

    match cli.command {
        Commands::Flags => flags(),
        Commands::Config => config(&driver),
        Commands::Create => {
            driver.create().await?;
            println!("created=true");
            if let Some(vm) = driver.vm_ref() {
                println!("vmid={}", vm.vmid);
                println!("node={}", vm.node);
            }
            println!("ip={}", driver.ip().await?);
        }
        Commands::State => match driver.state().await {
            Ok(state) => println!("state={}", state_as_str(state)),
            Err(err) => {
                println!("state={}", state_as_str(State::Error));
                return Err(err.into());
            }
        },
        Commands::Ip => println!("ip={}", driver.ip().await?),
        Commands::Url => println!("url={}", driver.url().await?),
        Commands::SshHostname => println!("ssh_hostname={}", driver.ssh_hostname().await?),
        Commands::Start => {
            driver.start().await?;
            println!("started=true");
        }
        Commands::Stop => {
            driver.stop().await?;
            println!("stopped=true");
        }
        Commands::Kill => {
            driver.kill().await?;
            println!("killed=true");
        }
        Commands::Restart => {
            driver.restart().await?;
            println!("restarted=true");
        }
        Commands::Remove => {
            driver.remove().await?;
            println!("removed=true");
        }
    }

    Ok(())
}

fn build_driver(cli: &Cli) -> Result<Driver, Box<dyn std::error::Error>> {
    let verbosity = if cli.machine.debug {
        Verbosity::Debug
    } else {
        Verbosity::Normal
    };
    let mut driver = Driver::new(
        cli.machine.machine_name.clone(),
        cli.machine.store_path.clone(),
        verbosity,
    );

    let mut options = CheckDriverOptions::new(driver.create_flags())
        .value(FLAG_API_URL, cli.proxmox.api_url.clone())
        .value(FLAG_USER, cli.proxmox.user.clone())
        .value(FLAG_PASS, cli.proxmox.pass.clone())
        .value(FLAG_OTP, cli.proxmox.otp.clone())
        .value(FLAG_NODE, cli.proxmox.node.clone());
    driver.set_config_from_flags(&mut options)?;

    if let Some(ip) = &cli.machine.ip_address {
        driver.descriptor_mut().ip_address = ip.clone();
    }

    Ok(driver)
}

fn flags() {
    for flag in create_flags() {
        println!("flag={} env={} default={}", flag.name, flag.env_var, flag.default);
    }
}

fn config(driver: &Driver) {
    let descriptor = driver.descriptor();
    println!("driver={}", driver.driver_name());
    println!("machine_name={}", descriptor.machine_name);
    println!("api_url={}", descriptor.api_url);
    println!("user={}", descriptor.user);
    println!("node={}", descriptor.node);
    println!("otp_set={}", !descriptor.otp.is_empty());
    println!("ssh_user={}", descriptor.ssh_user);
    println!("ssh_port={}", descriptor.ssh_port);
}

fn state_as_str(state: State) -> &'static str {
    match state {
        State::None => "none",
        State::Running => "running",
        State::Stopped => "stopped",
        State::Starting => "starting",
        State::Error => "error",
    }
}
