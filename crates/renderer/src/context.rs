use std::sync::Arc;

use anyhow::{anyhow, Context as AnyhowContext, Result};

use crate::types::{
    AdapterProfile, ColorSpaceMode, GpuMemoryMode, GpuPowerPreference, RenderTarget,
    RendererOptions, SurfaceHandle,
};

/// One rung of the adapter fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AdapterTier {
    pub label: &'static str,
    pub backends: wgpu::Backends,
    pub force_fallback: bool,
}

/// Native modern APIs first, then GL, then a software adapter if allowed.
pub(crate) fn adapter_tiers(allow_software: bool) -> Vec<AdapterTier> {
    let mut tiers = vec![
        AdapterTier {
            label: "primary",
            backends: wgpu::Backends::PRIMARY,
            force_fallback: false,
        },
        AdapterTier {
            label: "gl",
            backends: wgpu::Backends::GL,
            force_fallback: false,
        },
    ];
    if allow_software {
        tiers.push(AdapterTier {
            label: "software",
            backends: wgpu::Backends::all(),
            force_fallback: true,
        });
    }
    tiers
}

pub(crate) struct WindowSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub window: Option<WindowSurface>,
    pub color_format: wgpu::TextureFormat,
    pub size: (u32, u32),
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    /// Walks the adapter tiers until one yields a device.
    pub(crate) fn acquire(target: &RenderTarget, options: &RendererOptions) -> Result<Self> {
        let mut last_error = None;
        for tier in adapter_tiers(options.allow_software) {
            match Self::try_tier(tier, target, options) {
                Ok(context) => {
                    tracing::info!(
                        tier = tier.label,
                        adapter = %context.adapter_profile,
                        "acquired GPU context"
                    );
                    return Ok(context);
                }
                Err(err) => {
                    tracing::debug!(tier = tier.label, error = %err, "GPU tier unavailable");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no adapter tiers were attempted")))
    }

    fn try_tier(
        tier: AdapterTier,
        target: &RenderTarget,
        options: &RendererOptions,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: tier.backends,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let (width, height) = target.size();
        let size = (width.max(1), height.max(1));

        let surface = match target {
            RenderTarget::Headless { .. } => None,
            RenderTarget::Window { handle, .. } => Some(
                instance
                    .create_surface(Arc::<dyn SurfaceHandle>::clone(handle))
                    .context("failed to create rendering surface")?,
            ),
        };

        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: tier.force_fallback,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
        tracing::debug!(
            tier = tier.label,
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if size.0 > max_dimension || size.1 > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested target is {}x{}",
                size.0,
                size.1
            );
        }

        let memory_hints = match options.memory {
            GpuMemoryMode::Balanced => wgpu::MemoryHints::MemoryUsage,
            GpuMemoryMode::Performance => wgpu::MemoryHints::Performance,
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("segue device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured GPU error");
        }));

        let (window, color_format) = match surface {
            None => (None, headless_format(options.color_space)),
            Some(surface) => {
                let config = configure_surface(&surface, &adapter, &device, size, options)?;
                let format = config.format;
                (Some(WindowSurface { surface, config }), format)
            }
        };

        Ok(Self {
            _instance: instance,
            device,
            queue,
            window,
            color_format,
            size,
            adapter_profile,
        })
    }
}

fn headless_format(color_space: ColorSpaceMode) -> wgpu::TextureFormat {
    match color_space {
        ColorSpaceMode::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        ColorSpaceMode::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// Texture format used for uploaded sources.
pub(crate) fn source_format(color_space_is_linear: bool) -> wgpu::TextureFormat {
    if color_space_is_linear {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

fn configure_surface(
    surface: &wgpu::Surface<'static>,
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    size: (u32, u32),
    options: &RendererOptions,
) -> Result<wgpu::SurfaceConfiguration> {
    let caps = surface.get_capabilities(adapter);
    let first = caps
        .formats
        .first()
        .copied()
        .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
    let want_srgb = options.color_space == ColorSpaceMode::Linear;
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == want_srgb)
        .unwrap_or_else(|| {
            tracing::warn!(
                fallback = ?first,
                want_srgb,
                "no surface format matches the requested colour space"
            );
            first
        });

    let present_mode = if options.vsync {
        wgpu::PresentMode::Fifo
    } else {
        caps.present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Immediate)
            .or_else(|| {
                caps.present_modes
                    .iter()
                    .copied()
                    .find(|mode| *mode == wgpu::PresentMode::Mailbox)
            })
            .unwrap_or(wgpu::PresentMode::Fifo)
    };
    tracing::debug!(?format, ?present_mode, "configuring window surface");

    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.0,
        height: size.1,
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &config);
    Ok(config)
}
